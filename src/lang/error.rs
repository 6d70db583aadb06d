use super::Offset;
use crate::mach::Address;

#[derive(Clone, PartialEq)]
pub struct Error {
    code: ErrorCode,
    position: Position,
    message: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Position {
    Unknown,
    Source(Offset),
    Instruction(Address),
}

#[doc(hidden)]
#[macro_export]
macro_rules! error {
    ($err:ident) => {
        $crate::lang::Error::new($crate::lang::ErrorCode::$err)
    };
    ($err:ident, ..$offset:expr) => {
        $crate::lang::Error::new($crate::lang::ErrorCode::$err).at_offset($offset)
    };
    ($err:ident, @$addr:expr) => {
        $crate::lang::Error::new($crate::lang::ErrorCode::$err).in_address($addr)
    };
    ($err:ident; $msg:expr) => {
        $crate::lang::Error::new($crate::lang::ErrorCode::$err).message($msg)
    };
    ($err:ident, ..$offset:expr; $msg:expr) => {
        $crate::lang::Error::new($crate::lang::ErrorCode::$err)
            .at_offset($offset)
            .message($msg)
    };
    ($err:ident, @$addr:expr; $msg:expr) => {
        $crate::lang::Error::new($crate::lang::ErrorCode::$err)
            .in_address($addr)
            .message($msg)
    };
}

impl Error {
    pub fn new(code: ErrorCode) -> Error {
        Error {
            code,
            position: Position::Unknown,
            message: String::new(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn position(&self) -> Position {
        self.position
    }

    /// Attaches a source offset unless the error already carries a position.
    pub fn at_offset(mut self, offset: Offset) -> Error {
        if self.position == Position::Unknown {
            self.position = Position::Source(offset);
        }
        self
    }

    /// Attaches an instruction address unless the error already carries a position.
    pub fn in_address(mut self, addr: Address) -> Error {
        if self.position == Position::Unknown {
            self.position = Position::Instruction(addr);
        }
        self
    }

    pub fn message<S: Into<String>>(mut self, message: S) -> Error {
        debug_assert!(self.message.is_empty());
        self.message = message.into();
        self
    }
}

impl std::error::Error for Error {}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ErrorCode {
    SyntaxError = 2,
    UnexpectedCharacter = 3,
    IllegalFunctionCall = 5,
    Overflow = 6,
    OutOfMemory = 7,
    UndefinedSymbol = 8,
    SubscriptOutOfRange = 9,
    Redefined = 10,
    DivisionByZero = 11,
    TypeMismatch = 13,
    NameTooLong = 15,
    StackUnderflow = 22,
    LineBufferOverflow = 23,
    UndefinedValue = 24,
    Break = 30,
    InternalError = 51,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        use ErrorCode::*;
        match self {
            SyntaxError => "SYNTAX ERROR",
            UnexpectedCharacter => "UNEXPECTED CHARACTER",
            IllegalFunctionCall => "ILLEGAL FUNCTION CALL",
            Overflow => "OVERFLOW",
            OutOfMemory => "OUT OF MEMORY",
            UndefinedSymbol => "UNDEFINED SYMBOL",
            SubscriptOutOfRange => "SUBSCRIPT OUT OF RANGE",
            Redefined => "SYMBOL ALREADY DEFINED",
            DivisionByZero => "DIVISION BY ZERO",
            TypeMismatch => "TYPE MISMATCH",
            NameTooLong => "NAME TOO LONG",
            StackUnderflow => "STACK UNDERFLOW",
            LineBufferOverflow => "LINE BUFFER OVERFLOW",
            UndefinedValue => "UNDEFINED VALUE",
            Break => "BREAK",
            InternalError => "INTERNAL ERROR",
        }
    }
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Error {{ {} }}", self.to_string())
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.code.as_str())?;
        match self.position {
            Position::Unknown => {}
            Position::Source(offset) => write!(f, " AT {}", offset)?,
            Position::Instruction(addr) => write!(f, " IN {}", addr)?,
        }
        if !self.message.is_empty() {
            write!(f, "; {}", self.message)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(error!(SyntaxError).to_string(), "SYNTAX ERROR");
        assert_eq!(
            error!(TypeMismatch, ..12; "EXPECTED INT").to_string(),
            "TYPE MISMATCH AT 12; EXPECTED INT"
        );
        assert_eq!(error!(DivisionByZero, @7).to_string(), "DIVISION BY ZERO IN 7");
    }

    #[test]
    fn test_first_position_wins() {
        let e = error!(Overflow, ..3).at_offset(9).in_address(1);
        assert_eq!(e.position(), Position::Source(3));
    }
}
