//! Control-channel line protocol.
//!
//! Commands arrive one per line as `CMD:<name>` or `CMD:<name>:<argument>`.
//! Responses are `OK:...`, `ERROR:...` or unsolicited `STATUS:...` lines.

/// A parsed control command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Select the operating mode by rate name, e.g. `2400S`
    DataRate(String),
    /// Enable or disable WAV capture of transmissions
    RecordTx(bool),
    /// Path prefix for capture files
    RecordPrefix(String),
    /// Modulate the data-plane buffer and report the capture file
    SendBuffer,
    /// Demodulate a PCM file and emit the bytes on the data plane
    RxAudioInject(String),
    /// Abort the transmit buffer
    KillTx,
}

/// Parse one line from the control socket. The error string is the message
/// to send back after `ERROR:`.
pub fn parse_line(line: &str) -> Result<Command, String> {
    let line = line.trim_end_matches(['\r', '\n']).trim();
    let rest = line
        .strip_prefix("CMD:")
        .ok_or_else(|| format!("UNRECOGNIZED COMMAND:{}", line))?;

    let (name, argument) = match rest.find(':') {
        Some(pos) => (&rest[..pos], Some(&rest[pos + 1..])),
        None => (rest, None),
    };

    match (name, argument) {
        ("DATA RATE", Some(arg)) if !arg.is_empty() => Ok(Command::DataRate(arg.to_string())),
        ("RECORD TX", Some("ON")) => Ok(Command::RecordTx(true)),
        ("RECORD TX", Some("OFF")) => Ok(Command::RecordTx(false)),
        ("RECORD PREFIX", Some(arg)) if !arg.is_empty() => {
            Ok(Command::RecordPrefix(arg.to_string()))
        }
        ("SENDBUFFER", None) => Ok(Command::SendBuffer),
        ("RXAUDIOINJECT", Some(arg)) if !arg.is_empty() => {
            Ok(Command::RxAudioInject(arg.to_string()))
        }
        ("KILL TX", None) => Ok(Command::KillTx),
        _ => Err(format!("UNRECOGNIZED COMMAND:{}", line)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_command() {
        assert_eq!(
            parse_line("CMD:DATA RATE:2400S"),
            Ok(Command::DataRate("2400S".into()))
        );
        assert_eq!(parse_line("CMD:RECORD TX:ON"), Ok(Command::RecordTx(true)));
        assert_eq!(parse_line("CMD:RECORD TX:OFF"), Ok(Command::RecordTx(false)));
        assert_eq!(
            parse_line("CMD:RECORD PREFIX:capture/test"),
            Ok(Command::RecordPrefix("capture/test".into()))
        );
        assert_eq!(parse_line("CMD:SENDBUFFER"), Ok(Command::SendBuffer));
        assert_eq!(
            parse_line("CMD:RXAUDIOINJECT:/tmp/rx.pcm"),
            Ok(Command::RxAudioInject("/tmp/rx.pcm".into()))
        );
        assert_eq!(parse_line("CMD:KILL TX"), Ok(Command::KillTx));
    }

    #[test]
    fn line_endings_are_stripped() {
        assert_eq!(parse_line("CMD:SENDBUFFER\r\n"), Ok(Command::SendBuffer));
    }

    #[test]
    fn unknown_commands_error() {
        assert!(parse_line("CMD:NOPE").is_err());
        assert!(parse_line("HELLO").is_err());
        assert!(parse_line("CMD:RECORD TX:MAYBE").is_err());
        assert!(parse_line("CMD:DATA RATE:").is_err());
    }

    #[test]
    fn arguments_keep_embedded_colons() {
        assert_eq!(
            parse_line("CMD:RXAUDIOINJECT:C:/captures/rx.pcm"),
            Ok(Command::RxAudioInject("C:/captures/rx.pcm".into()))
        );
    }
}
