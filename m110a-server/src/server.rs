//! TCP server exposing the modem over the MS-DMT control/data socket pair.
//!
//! The control socket is line-oriented ASCII; the data socket carries raw
//! payload bytes in both directions. Bytes received on the data plane
//! accumulate in the transmit buffer until `CMD:SENDBUFFER` modulates them;
//! `CMD:RXAUDIOINJECT` demodulates a capture file and writes the recovered
//! bytes back out on the data plane.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;

use chrono::Local;

use m110a_core::{pcm, DecodeOutcome, Demodulator, ModeId, ModemConfig, Modulator};

use crate::protocol::{parse_line, Command};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub control_port: u16,
    pub data_port: u16,
    pub modem: ModemConfig,
    pub initial_mode: ModeId,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".to_string(),
            control_port: 4999,
            data_port: 4998,
            modem: ModemConfig::default(),
            initial_mode: ModeId::M2400S,
        }
    }
}

/// Mutable state shared between the control and data planes.
struct Shared {
    mode: ModeId,
    record: bool,
    prefix: String,
    tx_buffer: Vec<u8>,
    data_stream: Option<TcpStream>,
    modem: ModemConfig,
}

/// A bound server ready to accept connections.
pub struct Server {
    control: TcpListener,
    data: TcpListener,
    shared: Arc<Mutex<Shared>>,
}

impl Server {
    pub fn bind(config: &ServerConfig) -> io::Result<Server> {
        let control =
            TcpListener::bind((config.bind_addr.as_str(), config.control_port))?;
        let data = TcpListener::bind((config.bind_addr.as_str(), config.data_port))?;
        let shared = Arc::new(Mutex::new(Shared {
            mode: config.initial_mode,
            record: false,
            prefix: "tx".to_string(),
            tx_buffer: Vec::new(),
            data_stream: None,
            modem: config.modem.clone(),
        }));
        Ok(Server { control, data, shared })
    }

    pub fn control_addr(&self) -> io::Result<SocketAddr> {
        self.control.local_addr()
    }

    pub fn data_addr(&self) -> io::Result<SocketAddr> {
        self.data.local_addr()
    }

    /// Accept connections until the process exits. The data plane runs on
    /// its own thread; each control connection gets one handler thread.
    pub fn serve(self) -> io::Result<()> {
        let shared = Arc::clone(&self.shared);
        let data_listener = self.data;
        thread::spawn(move || data_plane(data_listener, shared));

        for stream in self.control.incoming() {
            let Ok(stream) = stream else { continue };
            let shared = Arc::clone(&self.shared);
            thread::spawn(move || {
                let _ = control_session(stream, shared);
            });
        }
        Ok(())
    }
}

/// Accept one data connection at a time and pump incoming bytes into the
/// transmit buffer.
fn data_plane(listener: TcpListener, shared: Arc<Mutex<Shared>>) {
    for stream in listener.incoming() {
        let Ok(stream) = stream else { continue };
        let reader = stream.try_clone();
        if let Ok(mut guard) = shared.lock() {
            guard.data_stream = Some(stream);
        }
        let Ok(mut reader) = reader else { continue };

        let mut buf = [0u8; 4096];
        loop {
            match reader.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if let Ok(mut guard) = shared.lock() {
                        guard.tx_buffer.extend_from_slice(&buf[..n]);
                    }
                }
            }
        }
        if let Ok(mut guard) = shared.lock() {
            guard.data_stream = None;
        }
    }
}

fn control_session(stream: TcpStream, shared: Arc<Mutex<Shared>>) -> io::Result<()> {
    let mut writer = stream.try_clone()?;
    writeln!(writer, "MODEM READY")?;

    let reader = BufReader::new(stream);
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match parse_line(&line) {
            Ok(command) => handle_command(command, &mut writer, &shared)?,
            Err(message) => writeln!(writer, "ERROR:{}", message)?,
        }
    }
    Ok(())
}

fn handle_command(
    command: Command,
    writer: &mut TcpStream,
    shared: &Arc<Mutex<Shared>>,
) -> io::Result<()> {
    match command {
        Command::DataRate(name) => match ModeId::from_rate_name(&name) {
            Some(mode) => {
                shared.lock().unwrap().mode = mode;
                writeln!(writer, "OK:DATA RATE:{}", name)
            }
            None => writeln!(writer, "ERROR:UNSUPPORTED DATA RATE:{}", name),
        },
        Command::RecordTx(on) => {
            shared.lock().unwrap().record = on;
            writeln!(writer, "OK:RECORD TX:{}", if on { "ON" } else { "OFF" })
        }
        Command::RecordPrefix(prefix) => {
            shared.lock().unwrap().prefix = prefix.clone();
            writeln!(writer, "OK:RECORD PREFIX:{}", prefix)
        }
        Command::SendBuffer => send_buffer(writer, shared),
        Command::RxAudioInject(path) => rx_audio_inject(&path, writer, shared),
        Command::KillTx => {
            shared.lock().unwrap().tx_buffer.clear();
            writeln!(writer, "STATUS:TX:IDLE")?;
            writeln!(writer, "OK:KILL TX")
        }
    }
}

fn send_buffer(writer: &mut TcpStream, shared: &Arc<Mutex<Shared>>) -> io::Result<()> {
    let (payload, mode, prefix, record, modem) = {
        let mut guard = shared.lock().unwrap();
        (
            std::mem::take(&mut guard.tx_buffer),
            guard.mode,
            guard.prefix.clone(),
            guard.record,
            guard.modem.clone(),
        )
    };

    writeln!(writer, "STATUS:TX:TRANSMIT")?;

    let modulator = match Modulator::new(mode, &modem) {
        Ok(modulator) => modulator,
        Err(error) => {
            writeln!(writer, "STATUS:TX:IDLE")?;
            return writeln!(writer, "ERROR:TX FAILED:{}", error);
        }
    };
    let audio = match modulator.modulate(&payload) {
        Ok(audio) => audio,
        Err(error) => {
            writeln!(writer, "STATUS:TX:IDLE")?;
            return writeln!(writer, "ERROR:TX FAILED:{}", error);
        }
    };

    let stamp = Local::now().format("%Y%m%d_%H%M%S_%3f");
    let path = PathBuf::from(format!("{}_{}.pcm", prefix, stamp));
    if let Err(error) = pcm::write_pcm(&path, &audio) {
        writeln!(writer, "STATUS:TX:IDLE")?;
        return writeln!(writer, "ERROR:TX FAILED:{}", error);
    }
    if record {
        let wav_path = path.with_extension("wav");
        if let Err(error) = write_wav(&wav_path, &audio, modem.sample_rate as u32) {
            writeln!(writer, "ERROR:RECORD FAILED:{}", error)?;
        }
    }

    writeln!(writer, "STATUS:TX:IDLE")?;
    writeln!(writer, "OK:SENDBUFFER FILE:{}", path.display())
}

fn write_wav(path: &Path, audio: &[f32], sample_rate: u32) -> hound::Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut wav = hound::WavWriter::create(path, spec)?;
    for &value in &pcm::quantize(audio) {
        wav.write_sample(value)?;
    }
    wav.finalize()
}

fn rx_audio_inject(
    path: &str,
    writer: &mut TcpStream,
    shared: &Arc<Mutex<Shared>>,
) -> io::Result<()> {
    let file = Path::new(path);
    if !file.is_file() {
        return writeln!(writer, "ERROR:FILE NOT FOUND:{}", path);
    }
    writeln!(writer, "RXAUDIOINJECT:STARTED")?;

    let modem = shared.lock().unwrap().modem.clone();
    let samples = match pcm::read_pcm(file) {
        Ok(samples) => samples,
        Err(error) => {
            writeln!(writer, "ERROR:READ FAILED:{}", error)?;
            return writeln!(writer, "RXAUDIOINJECT:COMPLETE");
        }
    };
    let demodulator = match Demodulator::new(&modem) {
        Ok(demodulator) => demodulator,
        Err(error) => {
            writeln!(writer, "ERROR:RX FAILED:{}", error)?;
            return writeln!(writer, "RXAUDIOINJECT:COMPLETE");
        }
    };

    match demodulator.demodulate(&samples) {
        DecodeOutcome::Decoded { mode, bytes, .. } => {
            writeln!(writer, "STATUS:RX:{}", mode.rate_name())?;
            // Decoded blocks are zero-padded past the payload; the data
            // plane carries the message without the trailing fill
            let end = bytes.iter().rposition(|&b| b != 0).map_or(0, |p| p + 1);
            let stream = shared.lock().unwrap().data_stream.as_ref().map(|s| s.try_clone());
            if let Some(Ok(mut data)) = stream {
                let _ = data.write_all(&bytes[..end]);
                let _ = data.flush();
            }
            writeln!(writer, "STATUS:RX:NO DCD")?;
        }
        DecodeOutcome::UnknownMode { sync } => {
            writeln!(writer, "STATUS:RX:NO DCD")?;
            writeln!(writer, "ERROR:UNKNOWN MODE:D1={} D2={}", sync.d1, sync.d2)?;
        }
        DecodeOutcome::NoPreamble { .. } => {
            writeln!(writer, "STATUS:RX:NO DCD")?;
            writeln!(writer, "ERROR:NO PREAMBLE")?;
        }
    }
    writeln!(writer, "RXAUDIOINJECT:COMPLETE")
}
