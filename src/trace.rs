use std::{
    fs,
    io::{self, BufRead, BufReader, Read},
    path::Path,
    str::FromStr,
};

use thiserror::Error;
use xz2::read::XzDecoder;

use crate::sim::{Access, Op};

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("failed to read trace")]
    Io(#[from] io::Error),
    #[error("line {line}: {reason}")]
    Malformed { line: usize, reason: ParseError },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("missing operation")]
    MissingOp,
    #[error("unknown operation `{0}`")]
    UnknownOp(String),
    #[error("expected `ADDR,SIZE`, found `{0}`")]
    MissingSize(String),
    #[error("invalid hex address `{0}`")]
    BadAddr(String),
    #[error("invalid access size `{0}`")]
    BadSize(String),
    #[error("record is not valid UTF-8")]
    NotUtf8,
}

/// A parsed trace line. Instruction fetches are recognised but not simulated.
#[derive(Debug, PartialEq, Eq)]
pub enum Record {
    Data(Access),
    Instr,
}

impl FromStr for Record {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut fields = s.split_whitespace();
        let op = fields.next().ok_or(ParseError::MissingOp)?;
        let op = match op {
            "I" => return Ok(Record::Instr),
            "L" => Op::Load,
            "S" => Op::Store,
            "M" => Op::Modify,
            other => return Err(ParseError::UnknownOp(other.to_string())),
        };

        let rest: String = fields.collect();
        let (addr, size) = rest
            .split_once(',')
            .ok_or_else(|| ParseError::MissingSize(rest.clone()))?;
        let addr_digits = addr.trim_start_matches("0x");
        let addr = u64::from_str_radix(addr_digits, 16)
            .map_err(|_| ParseError::BadAddr(addr.to_string()))?;
        let size = size
            .parse()
            .map_err(|_| ParseError::BadSize(size.to_string()))?;

        Ok(Record::Data(Access { op, addr, size }))
    }
}

impl FromStr for Access {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.parse()? {
            Record::Data(access) => Ok(access),
            Record::Instr => Err(ParseError::UnknownOp("I".to_string())),
        }
    }
}

/// Line-oriented reader over a valgrind-style memory trace.
pub struct Trace<R> {
    lines: io::Split<R>,
    line_no: usize,
}

impl Trace<BufReader<Box<dyn Read>>> {
    /// Opens `path`, decompressing it on the fly if it ends in `.xz`.
    pub fn open(path: &Path) -> io::Result<Self> {
        let stream = fs::File::open(path)?;
        let stream: Box<dyn Read> = match path.extension() {
            Some(ext) if ext == "xz" => Box::new(XzDecoder::new(stream)),
            _ => Box::new(stream),
        };
        Ok(Trace::new(BufReader::new(stream)))
    }
}

impl<R: BufRead> Trace<R> {
    pub fn new(reader: R) -> Self {
        Trace {
            lines: reader.split(b'\n'),
            line_no: 0,
        }
    }
}

impl<R: BufRead> Iterator for Trace<R> {
    type Item = Result<Access, TraceError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = self.lines.next()?;
            self.line_no += 1;
            let line = match line.map(String::from_utf8) {
                Ok(Ok(line)) => line,
                Ok(Err(_)) => {
                    return Some(Err(TraceError::Malformed {
                        line: self.line_no,
                        reason: ParseError::NotUtf8,
                    }))
                }
                Err(err) => return Some(Err(err.into())),
            };
            if line.trim().is_empty() {
                continue;
            }
            match line.parse() {
                Ok(Record::Data(access)) => return Some(Ok(access)),
                Ok(Record::Instr) => {
                    log::debug!("line {}: skipping instruction fetch", self.line_no);
                }
                Err(reason) => {
                    return Some(Err(TraceError::Malformed {
                        line: self.line_no,
                        reason,
                    }))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_data_records() {
        assert_eq!(
            " L 10,1".parse::<Access>().unwrap(),
            Access {
                op: Op::Load,
                addr: 0x10,
                size: 1
            }
        );
        assert_eq!(
            " M 7ff000398,8".parse::<Access>().unwrap(),
            Access {
                op: Op::Modify,
                addr: 0x7ff000398,
                size: 8
            }
        );
        assert_eq!(
            "S 0x18, 4".parse::<Access>().unwrap(),
            Access {
                op: Op::Store,
                addr: 0x18,
                size: 4
            }
        );
    }

    #[test]
    fn recognises_instruction_fetch() {
        assert_eq!("I 0400d7d4,8".parse::<Record>(), Ok(Record::Instr));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(
            "X 10,1".parse::<Record>(),
            Err(ParseError::UnknownOp("X".to_string()))
        );
        assert_eq!(
            "L 10".parse::<Record>(),
            Err(ParseError::MissingSize("10".to_string()))
        );
        assert_eq!(
            "L zz,1".parse::<Record>(),
            Err(ParseError::BadAddr("zz".to_string()))
        );
        assert_eq!(
            "L 10,".parse::<Record>(),
            Err(ParseError::BadSize(String::new()))
        );
        assert_eq!("".parse::<Record>(), Err(ParseError::MissingOp));
    }

    #[test]
    fn iterates_with_line_numbers() {
        let text = "I 0400d7d4,8\n L 10,1\n\n M 20,1\n L bogus\n S 18,1\n";
        let mut trace = Trace::new(text.as_bytes());
        assert_eq!(trace.next().unwrap().unwrap().addr, 0x10);
        assert_eq!(trace.next().unwrap().unwrap().op, Op::Modify);
        match trace.next().unwrap() {
            Err(TraceError::Malformed { line, .. }) => assert_eq!(line, 5),
            other => panic!("expected malformed record, got {other:?}"),
        }
        assert_eq!(trace.next().unwrap().unwrap().op, Op::Store);
        assert!(trace.next().is_none());
    }

    #[test]
    fn reports_line_of_invalid_utf8() {
        let bytes: &[u8] = b" L 10,1\n L \xff\xfe,1\n";
        let mut trace = Trace::new(bytes);
        assert_eq!(trace.next().unwrap().unwrap().addr, 0x10);
        match trace.next().unwrap() {
            Err(TraceError::Malformed { line, reason }) => {
                assert_eq!(line, 2);
                assert_eq!(reason, ParseError::NotUtf8);
            }
            other => panic!("expected malformed record, got {other:?}"),
        }
        assert!(trace.next().is_none());
    }

    #[test]
    fn accepts_crlf_line_endings() {
        let mut trace = Trace::new(&b" L 10,1\r\n S 18,4\r\n"[..]);
        assert_eq!(trace.next().unwrap().unwrap().op, Op::Load);
        assert_eq!(trace.next().unwrap().unwrap().size, 4);
        assert!(trace.next().is_none());
    }
}
