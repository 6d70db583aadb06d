#[derive(Debug, PartialEq, Clone)]
pub enum Token {
    Eof,
    Ident(String),
    Literal(Literal),
    Word(Word),
    Operator(Operator),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Colon,
    Semicolon,
    Dot,
}

/// Binding tiers, lowest first.
#[derive(Debug, PartialEq, PartialOrd, Clone, Copy)]
pub enum Precedence {
    None,
    Assignment,
    Or,
    And,
    Equality,
    Comparison,
    Term,
    Factor,
    Unary,
    Call,
    Primary,
}

impl Token {
    pub fn from_string(s: &str) -> Option<Token> {
        match s {
            "true" => Some(Token::Literal(Literal::Boolean(true))),
            "false" => Some(Token::Literal(Literal::Boolean(false))),
            _ => Word::from_string(s).map(Token::Word),
        }
    }

    pub fn precedence(&self) -> Precedence {
        match self {
            Token::Eof | Token::Word(_) | Token::Colon | Token::Semicolon => Precedence::None,
            Token::Operator(op) => op.precedence(),
            Token::LParen | Token::LBracket => Precedence::Call,
            _ => Precedence::Primary,
        }
    }

    pub fn is_eof(&self) -> bool {
        *self == Token::Eof
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        use Token::*;
        match self {
            Eof => write!(f, "END OF INPUT"),
            Ident(s) => write!(f, "{}", s),
            Literal(s) => write!(f, "{}", s),
            Word(s) => write!(f, "{}", s),
            Operator(s) => write!(f, "{}", s),
            LParen => write!(f, "("),
            RParen => write!(f, ")"),
            LBracket => write!(f, "["),
            RBracket => write!(f, "]"),
            Comma => write!(f, ","),
            Colon => write!(f, ":"),
            Semicolon => write!(f, ";"),
            Dot => write!(f, "."),
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum Literal {
    Integer(i32),
    Boolean(bool),
    String(String),
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        use Literal::*;
        match self {
            Integer(n) => write!(f, "{}", n),
            Boolean(b) => write!(f, "{}", b),
            String(s) => write!(f, "\"{}\"", s),
        }
    }
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Word {
    Print,
    If,
    Else,
    Endif,
    For,
    Endfor,
    While,
    Endwhile,
    Local,
    Func,
    Endfunc,
    Ret,
    Int,
    Float,
    Str,
    Bool,
    Arr,
}

impl Word {
    pub fn from_string(s: &str) -> Option<Word> {
        use Word::*;
        let word = match s {
            "print" => Print,
            "if" => If,
            "else" => Else,
            "endif" => Endif,
            "for" => For,
            "endfor" => Endfor,
            "while" => While,
            "endwhile" => Endwhile,
            "local" => Local,
            "func" => Func,
            "endfunc" => Endfunc,
            "ret" => Ret,
            "int" => Int,
            "float" => Float,
            "str" => Str,
            "bool" => Bool,
            "arr" => Arr,
            _ => return None,
        };
        Some(word)
    }

    pub fn is_type(self) -> bool {
        use Word::*;
        matches!(self, Int | Float | Str | Bool | Arr)
    }
}

impl std::fmt::Display for Word {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        use Word::*;
        match self {
            Print => write!(f, "print"),
            If => write!(f, "if"),
            Else => write!(f, "else"),
            Endif => write!(f, "endif"),
            For => write!(f, "for"),
            Endfor => write!(f, "endfor"),
            While => write!(f, "while"),
            Endwhile => write!(f, "endwhile"),
            Local => write!(f, "local"),
            Func => write!(f, "func"),
            Endfunc => write!(f, "endfunc"),
            Ret => write!(f, "ret"),
            Int => write!(f, "int"),
            Float => write!(f, "float"),
            Str => write!(f, "str"),
            Bool => write!(f, "bool"),
            Arr => write!(f, "arr"),
        }
    }
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Operator {
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulus,
    Assign,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Not,
    And,
    Or,
}

impl Operator {
    pub fn precedence(self) -> Precedence {
        use Operator::*;
        match self {
            Assign => Precedence::Assignment,
            Or => Precedence::Or,
            And => Precedence::And,
            Equal | NotEqual => Precedence::Equality,
            Less | LessEqual | Greater | GreaterEqual => Precedence::Comparison,
            Plus | Minus => Precedence::Term,
            Multiply | Divide | Modulus => Precedence::Factor,
            Not => Precedence::Unary,
        }
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        use Operator::*;
        match self {
            Plus => write!(f, "+"),
            Minus => write!(f, "-"),
            Multiply => write!(f, "*"),
            Divide => write!(f, "/"),
            Modulus => write!(f, "%"),
            Assign => write!(f, "="),
            Equal => write!(f, "=="),
            NotEqual => write!(f, "!="),
            Less => write!(f, "<"),
            LessEqual => write!(f, "<="),
            Greater => write!(f, ">"),
            GreaterEqual => write!(f, ">="),
            Not => write!(f, "!"),
            And => write!(f, "&&"),
            Or => write!(f, "||"),
        }
    }
}
