use super::{Address, Limits, LocalNames, Opcode, Program, Signature, SymbolTable, Type};
use crate::error;
use crate::lang::token::{Literal, Operator, Precedence, Token, Word};
use crate::lang::{Error, Lexer, Offset};
use std::convert::TryFrom;
use std::time::Instant;
use tracing::debug;

type Result<T> = std::result::Result<T, Error>;

/// Compiles one unit with default limits.
pub fn compile(source: &str) -> Result<Program> {
    compile_with(source, &Limits::default())
}

pub fn compile_with(source: &str, limits: &Limits) -> Result<Program> {
    Compiler::new(source, limits).compile()
}

/// ## Single-pass compiler
///
/// Recursive descent straight to bytecode; there is no syntax tree.
/// Each expression rule returns the static type it produced so the
/// caller can check agreement. Forward jumps are emitted with a zero
/// target and patched once the join point is reached. The first error
/// ends the unit and no `Program` is produced.

pub struct Compiler<'a> {
    lex: Lexer<'a>,
    token: Token,
    offset: Offset,
    prog: Program,
    symbols: SymbolTable,
    scope: Option<Scope>,
    depth: usize,
    limits: Limits,
}

/// The function whose body is being compiled.
struct Scope {
    locals: LocalNames,
    ret: Type,
}

#[derive(Debug, Clone, Copy)]
enum Place {
    Local(usize, Type),
    Global(usize, Type),
}

impl Place {
    fn ty(self) -> Type {
        match self {
            Place::Local(_, ty) | Place::Global(_, ty) => ty,
        }
    }
}

fn binary_opcode(op: Operator) -> Option<Opcode> {
    use Operator::*;
    Some(match op {
        Plus => Opcode::Add,
        Minus => Opcode::Subtract,
        Multiply => Opcode::Multiply,
        Divide => Opcode::Divide,
        Modulus => Opcode::Modulo,
        Equal => Opcode::Equals,
        NotEqual => Opcode::NotEquals,
        Less => Opcode::LessThan,
        LessEqual => Opcode::LessOrEquals,
        Greater => Opcode::GreaterThan,
        GreaterEqual => Opcode::GreaterOrEquals,
        And => Opcode::And,
        Or => Opcode::Or,
        Not | Assign => return None,
    })
}

impl<'a> Compiler<'a> {
    pub fn new(source: &'a str, limits: &Limits) -> Compiler<'a> {
        let limits = limits.clone().normalized();
        Compiler {
            lex: Lexer::new(source),
            token: Token::Eof,
            offset: 0,
            prog: Program::new(&limits),
            symbols: SymbolTable::new(&limits),
            scope: None,
            depth: 0,
            limits,
        }
    }

    pub fn compile(mut self) -> Result<Program> {
        let start = Instant::now();
        match self.program() {
            Ok(()) => {
                debug!(
                    bytes = self.prog.len(),
                    constants = self.prog.constant_count(),
                    globals = self.symbols.len(),
                    elapsed_us = start.elapsed().as_micros() as u64,
                    "compiled unit"
                );
                Ok(self.prog)
            }
            Err(error) => {
                let error = error.at_offset(self.offset);
                debug!(%error, "compile failed");
                Err(error)
            }
        }
    }

    fn program(&mut self) -> Result<()> {
        self.advance()?;
        while !self.token.is_eof() {
            self.statement()?;
        }
        self.emit(Opcode::Halt)?;
        Ok(())
    }

    // *** Token handling

    fn advance(&mut self) -> Result<()> {
        let (offset, token) = self.lex.next_token()?;
        self.offset = offset;
        self.token = token;
        Ok(())
    }

    fn accept(&mut self, token: &Token) -> Result<bool> {
        if self.token == *token {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect(&mut self, token: Token) -> Result<()> {
        if self.accept(&token)? {
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{}'", token)))
        }
    }

    fn unexpected(&self, expected: &str) -> Error {
        error!(SyntaxError, ..self.offset;
            format!("EXPECTED {} BUT FOUND '{}'", expected, self.token))
    }

    fn ident(&mut self) -> Result<String> {
        match &self.token {
            Token::Ident(name) => {
                let name = name.clone();
                self.advance()?;
                Ok(name)
            }
            _ => Err(self.unexpected("IDENTIFIER")),
        }
    }

    fn type_name(&mut self) -> Result<Type> {
        if let Token::Word(word) = self.token {
            if let Some(ty) = Type::from_word(word) {
                self.advance()?;
                return Ok(ty);
            }
        }
        Err(self.unexpected("TYPE"))
    }

    /// The current token's operator when it binds at one of `tiers`.
    fn operator(&self, tiers: &[Precedence]) -> Option<Operator> {
        match self.token {
            Token::Operator(op) if tiers.contains(&self.token.precedence()) => Some(op),
            _ => None,
        }
    }

    fn check(&self, expected: Type, found: Type, offset: Offset) -> Result<()> {
        if expected == found {
            Ok(())
        } else {
            Err(error!(TypeMismatch, ..offset;
                format!("EXPECTED {} BUT FOUND {}", expected, found)))
        }
    }

    // *** Emission

    fn emit(&mut self, op: Opcode) -> Result<Address> {
        self.prog.emit(op)
    }

    fn emit_binary(&mut self, op: Operator) -> Result<()> {
        match binary_opcode(op) {
            Some(opcode) => self.emit(opcode).map(|_| ()),
            None => Err(error!(InternalError; format!("'{}' IS NOT BINARY", op))),
        }
    }

    fn emit_byte(&mut self, value: usize) -> Result<()> {
        match u8::try_from(value) {
            Ok(byte) => self.prog.emit_u8(byte),
            Err(_) => Err(error!(Overflow; "OPERAND TOO LARGE")),
        }
    }

    fn emit_with(&mut self, op: Opcode, operand: usize) -> Result<()> {
        self.emit(op)?;
        self.emit_byte(operand)
    }

    fn emit_jump_to(&mut self, op: Opcode, target: Address) -> Result<()> {
        self.emit(op)?;
        self.prog.emit_addr(target)
    }

    fn load(&mut self, place: Place) -> Result<()> {
        match place {
            Place::Local(slot, _) => self.emit_with(Opcode::LoadLocal, slot),
            Place::Global(slot, _) => self.emit_with(Opcode::LoadGlobal, slot),
        }
    }

    fn resolve(&self, name: &str, offset: Offset) -> Result<Place> {
        if let Some(scope) = &self.scope {
            if let Some((slot, ty)) = scope.locals.find(name) {
                return Ok(Place::Local(slot, ty));
            }
        }
        match self.symbols.find(name) {
            Some(symbol) => Ok(Place::Global(symbol.slot, symbol.ty)),
            None => Err(error!(UndefinedSymbol, ..offset; format!("'{}'", name))),
        }
    }

    // *** Statements

    /// Compiles statements up to one of `terminators` or end of input.
    /// Returns true when the last statement was `ret`.
    fn block(&mut self, terminators: &[Word]) -> Result<bool> {
        self.nest("BLOCKS NESTED TOO DEEP")?;
        let mut returned = false;
        loop {
            match self.token {
                Token::Eof => break,
                Token::Word(word) if terminators.contains(&word) => break,
                _ => returned = self.statement()?,
            }
        }
        self.depth -= 1;
        Ok(returned)
    }

    /// Counts one level of recursion into a block or expression.
    fn nest(&mut self, message: &'static str) -> Result<()> {
        if self.depth >= self.limits.nesting {
            return Err(error!(OutOfMemory, ..self.offset; message));
        }
        self.depth += 1;
        Ok(())
    }

    fn statement(&mut self) -> Result<bool> {
        match self.token.clone() {
            Token::Word(Word::Print) => self.print_statement()?,
            Token::Word(Word::If) => self.if_statement()?,
            Token::Word(Word::For) => self.for_statement()?,
            Token::Word(Word::While) => self.while_statement()?,
            Token::Word(Word::Ret) => {
                self.ret_statement()?;
                return Ok(true);
            }
            Token::Word(Word::Local) => {
                return Err(error!(SyntaxError, ..self.offset;
                    "LOCAL VARIABLES ARE NOT SUPPORTED"))
            }
            Token::Ident(_) => match self.lex.peek()?.1 {
                Token::Colon | Token::LBracket | Token::Operator(Operator::Assign) => {
                    self.identifier_statement()?
                }
                _ => self.expression_statement()?,
            },
            Token::Literal(_)
            | Token::LParen
            | Token::LBracket
            | Token::Operator(Operator::Plus)
            | Token::Operator(Operator::Minus)
            | Token::Operator(Operator::Not) => self.expression_statement()?,
            _ => return Err(self.unexpected("STATEMENT")),
        }
        Ok(false)
    }

    fn expression_statement(&mut self) -> Result<()> {
        self.expression()?;
        self.emit(Opcode::Pop)?;
        Ok(())
    }

    fn print_statement(&mut self) -> Result<()> {
        self.advance()?;
        self.expect(Token::LParen)?;
        self.expression()?;
        self.expect(Token::RParen)?;
        self.emit(Opcode::Print)?;
        Ok(())
    }

    /// `( bool-expression )`
    fn condition(&mut self) -> Result<()> {
        self.expect(Token::LParen)?;
        let offset = self.offset;
        let ty = self.expression()?;
        self.check(Type::Bool, ty, offset)?;
        self.expect(Token::RParen)
    }

    fn if_statement(&mut self) -> Result<()> {
        self.advance()?;
        self.condition()?;
        let if_jump = self.prog.emit_jump(Opcode::JumpIfFalse)?;
        self.block(&[Word::Else, Word::Endif])?;
        if self.accept(&Token::Word(Word::Else))? {
            let else_jump = self.prog.emit_jump(Opcode::Jump)?;
            self.prog.patch_jump(if_jump)?;
            self.block(&[Word::Endif])?;
            self.prog.patch_jump(else_jump)?;
        } else {
            self.prog.patch_jump(if_jump)?;
        }
        self.expect(Token::Word(Word::Endif))
    }

    fn while_statement(&mut self) -> Result<()> {
        self.advance()?;
        let top = self.prog.len();
        self.condition()?;
        let exit = self.prog.emit_jump(Opcode::JumpIfFalse)?;
        self.block(&[Word::Endwhile])?;
        self.emit_jump_to(Opcode::Jump, top)?;
        self.prog.patch_jump(exit)?;
        self.expect(Token::Word(Word::Endwhile))
    }

    /// Layout: init, cond, exit-jump, body-jump, step, jump-to-cond, body, jump-to-step.
    fn for_statement(&mut self) -> Result<()> {
        self.advance()?;
        self.expect(Token::LParen)?;
        self.simple_statement()?;
        self.expect(Token::Semicolon)?;
        let top = self.prog.len();
        let offset = self.offset;
        let ty = self.expression()?;
        self.check(Type::Bool, ty, offset)?;
        self.expect(Token::Semicolon)?;
        let exit = self.prog.emit_jump(Opcode::JumpIfFalse)?;
        let body = self.prog.emit_jump(Opcode::Jump)?;
        let step = self.prog.len();
        self.simple_statement()?;
        self.emit_jump_to(Opcode::Jump, top)?;
        self.expect(Token::RParen)?;
        self.prog.patch_jump(body)?;
        self.block(&[Word::Endfor])?;
        self.emit_jump_to(Opcode::Jump, step)?;
        self.prog.patch_jump(exit)?;
        self.expect(Token::Word(Word::Endfor))
    }

    fn simple_statement(&mut self) -> Result<()> {
        match self.token {
            Token::Ident(_) => self.identifier_statement(),
            _ => Err(self.unexpected("IDENTIFIER")),
        }
    }

    fn ret_statement(&mut self) -> Result<()> {
        let ret = match &self.scope {
            Some(scope) => scope.ret,
            None => return Err(error!(SyntaxError, ..self.offset; "RET OUTSIDE FUNCTION")),
        };
        self.advance()?;
        let offset = self.offset;
        let ty = self.expression()?;
        self.check(ret, ty, offset)?;
        self.emit(Opcode::Return)?;
        Ok(())
    }

    fn identifier_statement(&mut self) -> Result<()> {
        let offset = self.offset;
        let name = self.ident()?;
        match self.token {
            Token::Colon => self.declaration(&name),
            Token::Operator(Operator::Assign) => self.assignment(&name, offset),
            Token::LBracket => self.element_store(&name, offset),
            _ => Err(self.unexpected("':', '=' OR '['")),
        }
    }

    fn declaration(&mut self, name: &str) -> Result<()> {
        self.expect(Token::Colon)?;
        let ty = self.type_name()?;
        self.expect(Token::Operator(Operator::Assign))?;
        if self.accept(&Token::Word(Word::Func))? {
            return self.function_definition(name, ty);
        }
        let offset = self.offset;
        let found = self.expression()?;
        self.check(ty, found, offset)?;
        let slot = self.symbols.define(name, ty, None)?.slot;
        self.emit_with(Opcode::StoreGlobal, slot)
    }

    fn assignment(&mut self, name: &str, name_offset: Offset) -> Result<()> {
        let place = self.resolve(name, name_offset)?;
        if place.ty() == Type::Func {
            return Err(error!(SyntaxError, ..name_offset;
                format!("CANNOT ASSIGN TO FUNCTION '{}'", name)));
        }
        self.advance()?;
        let offset = self.offset;
        let found = self.expression()?;
        self.check(place.ty(), found, offset)?;
        match place {
            Place::Local(slot, _) => self.emit_with(Opcode::StoreLocal, slot),
            Place::Global(slot, _) => self.emit_with(Opcode::StoreGlobal, slot),
        }
    }

    fn element_store(&mut self, name: &str, name_offset: Offset) -> Result<()> {
        let place = self.resolve(name, name_offset)?;
        self.check(Type::Arr, place.ty(), name_offset)?;
        self.load(place)?;
        self.index()?;
        self.expect(Token::Operator(Operator::Assign))?;
        let offset = self.offset;
        let found = self.expression()?;
        self.check(Type::Int, found, offset)?;
        self.emit(Opcode::StoreElement)?;
        Ok(())
    }

    fn function_definition(&mut self, name: &str, ret: Type) -> Result<()> {
        if self.scope.is_some() {
            return Err(error!(SyntaxError, ..self.offset; "NESTED FUNCTION"));
        }
        self.expect(Token::LParen)?;
        let mut locals = LocalNames::new(&self.limits);
        if !self.accept(&Token::RParen)? {
            loop {
                let offset = self.offset;
                let param = self.ident()?;
                self.expect(Token::Colon)?;
                let ty = self.type_name()?;
                locals.add(&param, ty).map_err(|e| e.at_offset(offset))?;
                if self.accept(&Token::RParen)? {
                    break;
                }
                self.expect(Token::Comma)?;
            }
        }
        let params = locals.types();
        let arity = params.len();
        let signature = Signature {
            params: params.clone(),
            ret,
        };
        let slot = self.symbols.define(name, Type::Func, Some(signature))?.slot;

        let skip = self.prog.emit_jump(Opcode::Jump)?;
        let entry = self.prog.len();
        self.emit_with(Opcode::PushCallFrame, arity)?;
        self.emit_byte(ret as usize)?;
        for (index, ty) in params.iter().enumerate() {
            self.emit_with(Opcode::BindLocal, index)?;
            self.emit_byte(*ty as usize)?;
        }

        self.scope = Some(Scope { locals, ret });
        let returned = self.block(&[Word::Endfunc])?;
        let end = self.offset;
        self.expect(Token::Word(Word::Endfunc))?;
        self.scope = None;
        if !returned {
            self.implicit_return(ret, end)?;
        }
        self.prog.patch_jump(skip)?;

        self.emit_with(Opcode::DefineFunction, slot)?;
        self.prog.emit_addr(entry)?;
        self.emit_byte(arity)?;
        self.emit_byte(ret as usize)
    }

    fn implicit_return(&mut self, ret: Type, offset: Offset) -> Result<()> {
        let index = match ret {
            Type::Int => self.prog.add_number(0)?,
            Type::Bool => self.prog.add_boolean(false)?,
            Type::Str => self.prog.add_string("")?,
            Type::Arr => {
                self.emit_with(Opcode::MakeArray, 0)?;
                self.emit(Opcode::Return)?;
                return Ok(());
            }
            _ => {
                return Err(error!(SyntaxError, ..offset;
                    format!("MISSING RET OF {}", ret)))
            }
        };
        self.emit_with(Opcode::Constant, index)?;
        self.emit(Opcode::Return)?;
        Ok(())
    }

    // *** Expressions

    fn expression(&mut self) -> Result<Type> {
        self.nest("EXPRESSION TOO DEEP")?;
        let ty = self.logical_or()?;
        self.depth -= 1;
        Ok(ty)
    }

    fn logical_or(&mut self) -> Result<Type> {
        let offset = self.offset;
        let mut lhs = self.logical_and()?;
        while let Some(op) = self.operator(&[Precedence::Or]) {
            self.check(Type::Bool, lhs, offset)?;
            self.advance()?;
            let rhs_offset = self.offset;
            let rhs = self.logical_and()?;
            self.check(Type::Bool, rhs, rhs_offset)?;
            self.emit_binary(op)?;
            lhs = Type::Bool;
        }
        Ok(lhs)
    }

    fn logical_and(&mut self) -> Result<Type> {
        let offset = self.offset;
        let mut lhs = self.relational()?;
        while let Some(op) = self.operator(&[Precedence::And]) {
            self.check(Type::Bool, lhs, offset)?;
            self.advance()?;
            let rhs_offset = self.offset;
            let rhs = self.relational()?;
            self.check(Type::Bool, rhs, rhs_offset)?;
            self.emit_binary(op)?;
            lhs = Type::Bool;
        }
        Ok(lhs)
    }

    /// A run of `!` applies to the whole comparison that follows it.
    fn relational(&mut self) -> Result<Type> {
        let mut nots = 0;
        while self.accept(&Token::Operator(Operator::Not))? {
            nots += 1;
        }
        let offset = self.offset;
        let ty = self.comparison()?;
        if nots > 0 {
            self.check(Type::Bool, ty, offset)?;
            for _ in 0..nots {
                self.emit(Opcode::Not)?;
            }
        }
        Ok(ty)
    }

    fn comparison(&mut self) -> Result<Type> {
        let offset = self.offset;
        let lhs = self.arithmetic()?;
        if let Some(op) = self.operator(&[Precedence::Equality, Precedence::Comparison]) {
            self.check(Type::Int, lhs, offset)?;
            self.advance()?;
            let rhs_offset = self.offset;
            let rhs = self.arithmetic()?;
            self.check(Type::Int, rhs, rhs_offset)?;
            self.emit_binary(op)?;
            return Ok(Type::Bool);
        }
        Ok(lhs)
    }

    fn arithmetic(&mut self) -> Result<Type> {
        let offset = self.offset;
        let mut lhs = match self.operator(&[Precedence::Term]) {
            Some(op) => {
                self.advance()?;
                let ty = self.term()?;
                self.check(Type::Int, ty, offset)?;
                if op == Operator::Minus {
                    self.emit(Opcode::Negate)?;
                }
                Type::Int
            }
            None => self.term()?,
        };
        while let Some(op) = self.operator(&[Precedence::Term]) {
            self.check(Type::Int, lhs, offset)?;
            self.advance()?;
            let rhs_offset = self.offset;
            let rhs = self.term()?;
            self.check(Type::Int, rhs, rhs_offset)?;
            self.emit_binary(op)?;
            lhs = Type::Int;
        }
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Type> {
        let offset = self.offset;
        let mut lhs = self.factor()?;
        while let Some(op) = self.operator(&[Precedence::Factor]) {
            self.check(Type::Int, lhs, offset)?;
            self.advance()?;
            let rhs_offset = self.offset;
            let rhs = self.factor()?;
            self.check(Type::Int, rhs, rhs_offset)?;
            self.emit_binary(op)?;
            lhs = Type::Int;
        }
        Ok(lhs)
    }

    fn factor(&mut self) -> Result<Type> {
        let offset = self.offset;
        match self.token.clone() {
            Token::Literal(Literal::Integer(n)) => {
                let index = self.prog.add_number(n)?;
                self.emit_with(Opcode::Constant, index)?;
                self.advance()?;
                Ok(Type::Int)
            }
            Token::Literal(Literal::Boolean(b)) => {
                let index = self.prog.add_boolean(b)?;
                self.emit_with(Opcode::Constant, index)?;
                self.advance()?;
                Ok(Type::Bool)
            }
            Token::Literal(Literal::String(s)) => {
                let index = self.prog.add_string(&s)?;
                self.emit_with(Opcode::Constant, index)?;
                self.advance()?;
                Ok(Type::Str)
            }
            Token::Ident(name) => {
                self.advance()?;
                self.identifier_expression(&name, offset)
            }
            Token::LParen => {
                self.advance()?;
                let ty = self.expression()?;
                self.expect(Token::RParen)?;
                Ok(ty)
            }
            Token::LBracket => self.array_literal(),
            _ => Err(self.unexpected("EXPRESSION")),
        }
    }

    fn identifier_expression(&mut self, name: &str, offset: Offset) -> Result<Type> {
        let place = self.resolve(name, offset)?;
        self.load(place)?;
        match self.token {
            Token::LParen => self.call(name, place, offset),
            Token::LBracket => {
                self.check(Type::Arr, place.ty(), offset)?;
                self.index()?;
                self.emit(Opcode::IndexArray)?;
                Ok(Type::Int)
            }
            _ => Ok(place.ty()),
        }
    }

    /// Arguments are pushed left to right above the callee.
    fn call(&mut self, name: &str, place: Place, offset: Offset) -> Result<Type> {
        let signature = match place {
            Place::Global(..) => self.symbols.find(name).and_then(|s| s.signature.clone()),
            Place::Local(..) => None,
        };
        let signature = match signature {
            Some(signature) => signature,
            None => {
                return Err(error!(IllegalFunctionCall, ..offset;
                    format!("'{}' IS NOT A FUNCTION", name)))
            }
        };
        self.expect(Token::LParen)?;
        let mut arity = 0;
        if !self.accept(&Token::RParen)? {
            loop {
                let arg_offset = self.offset;
                let ty = self.expression()?;
                match signature.params.get(arity) {
                    Some(expected) => self.check(*expected, ty, arg_offset)?,
                    None => {
                        return Err(error!(IllegalFunctionCall, ..arg_offset;
                            "TOO MANY ARGUMENTS"))
                    }
                }
                arity += 1;
                if self.accept(&Token::RParen)? {
                    break;
                }
                self.expect(Token::Comma)?;
            }
        }
        if arity != signature.params.len() {
            return Err(error!(IllegalFunctionCall, ..offset;
                format!("EXPECTED {} ARGUMENTS", signature.params.len())));
        }
        self.emit_with(Opcode::CallFunction, arity)?;
        Ok(signature.ret)
    }

    /// `[ int-expression ]`
    fn index(&mut self) -> Result<()> {
        self.expect(Token::LBracket)?;
        let offset = self.offset;
        let ty = self.expression()?;
        self.check(Type::Int, ty, offset)?;
        self.expect(Token::RBracket)
    }

    fn array_literal(&mut self) -> Result<Type> {
        let start = self.offset;
        self.expect(Token::LBracket)?;
        let mut count = 0;
        if !self.accept(&Token::RBracket)? {
            loop {
                let offset = self.offset;
                let ty = self.expression()?;
                self.check(Type::Int, ty, offset)?;
                count += 1;
                if self.accept(&Token::RBracket)? {
                    break;
                }
                self.expect(Token::Comma)?;
            }
        }
        if count > self.limits.array_len {
            return Err(error!(OutOfMemory, ..start; "ARRAY TOO LONG"));
        }
        self.emit_with(Opcode::MakeArray, count)?;
        Ok(Type::Arr)
    }
}
