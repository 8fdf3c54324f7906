//! Line-based prompts for the comparison tool.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use calcite_perf_common::LogType;

pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Read one trimmed line; `None` at end of input.
    fn ask(&mut self, prompt: &str) -> io::Result<Option<String>> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    /// Ask for a path until it names an existing file.
    ///
    /// Returns `None` when the user declines to retry or input ends.
    pub fn existing_file(&mut self, prompt: &str) -> io::Result<Option<PathBuf>> {
        loop {
            let Some(answer) = self.ask(prompt)? else {
                return Ok(None);
            };
            if answer.is_empty() {
                writeln!(self.output, "Please provide a file path")?;
                continue;
            }
            let path = PathBuf::from(&answer);
            if path.is_file() {
                return Ok(Some(path));
            }
            writeln!(self.output, "File not found: {answer}")?;

            loop {
                match self.ask("Try again? (y/n): ")?.as_deref() {
                    Some("y") | Some("Y") => break,
                    Some("n") | Some("N") | None => return Ok(None),
                    Some(_) => writeln!(self.output, "Please answer y or n")?,
                }
            }
        }
    }

    /// Ask for the log type; empty input accepts `detected`, `skip` gives `None`.
    pub fn log_type(&mut self, detected: Option<LogType>) -> io::Result<Option<LogType>> {
        let prompt = match detected {
            Some(log_type) => format!("Log type (vpc/nfw/cloudtrail/waf/big5/skip) [{log_type}]: "),
            None => "Log type (vpc/nfw/cloudtrail/waf/big5/skip): ".to_string(),
        };
        loop {
            let Some(answer) = self.ask(&prompt)? else {
                return Ok(detected);
            };
            if answer.is_empty() {
                if detected.is_some() {
                    return Ok(detected);
                }
                continue;
            }
            if answer.eq_ignore_ascii_case("skip") {
                return Ok(None);
            }
            match answer.parse::<LogType>() {
                Ok(log_type) => return Ok(Some(log_type)),
                Err(_) => writeln!(self.output, "Unknown log type: {answer}")?,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn prompter(input: &str) -> Prompter<Cursor<Vec<u8>>, Vec<u8>> {
        Prompter::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn test_existing_file_retries_after_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("calcite.csv");
        std::fs::write(&file, "Name\n").unwrap();

        let input = format!("/no/such/file.csv\ny\n{}\n", file.display());
        let mut p = prompter(&input);
        assert_eq!(p.existing_file("Calcite file: ").unwrap(), Some(file));

        let transcript = String::from_utf8(p.output).unwrap();
        assert!(transcript.contains("File not found: /no/such/file.csv"));
    }

    #[test]
    fn test_existing_file_asks_again_for_empty_path() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("opensearch.csv");
        std::fs::write(&file, "Name\n").unwrap();

        let input = format!("\n{}\n", file.display());
        let mut p = prompter(&input);
        assert_eq!(p.existing_file("OpenSearch file: ").unwrap(), Some(file));

        let transcript = String::from_utf8(p.output).unwrap();
        assert!(transcript.contains("Please provide a file path"));
        assert!(!transcript.contains("Try again?"));
    }

    #[test]
    fn test_existing_file_gives_up_on_no_or_eof() {
        let mut p = prompter("/missing.csv\nmaybe\nn\n");
        assert_eq!(p.existing_file("Calcite file: ").unwrap(), None);

        let mut p = prompter("");
        assert_eq!(p.existing_file("Calcite file: ").unwrap(), None);
    }

    #[test]
    fn test_log_type_prompt() {
        let mut p = prompter("syslog\nWAF\n");
        assert_eq!(p.log_type(None).unwrap(), Some(LogType::Waf));

        let mut p = prompter("\n");
        assert_eq!(p.log_type(Some(LogType::Vpc)).unwrap(), Some(LogType::Vpc));

        let mut p = prompter("skip\n");
        assert_eq!(p.log_type(Some(LogType::Vpc)).unwrap(), None);
    }
}
