//! Expression language for configuration documents.
//!
//! Two expression forms appear in config strings:
//!
//! - **Directives**: a string that is *entirely* `(( expr ))` is replaced by
//!   the expression's value before normalization, so a directive can produce
//!   any value shape, not just text. See [`expand_directives`].
//! - **Interpolations**: `{{ expr }}` spans inside an ordinary string are
//!   rendered to text after inheritance resolution, with `cfg` bound to the
//!   resolved tree. See [`interpolate`].
//!
//! The grammar is deliberately small: literals, identifier lookup in a fixed
//! namespace (`ctx`, `env`, `cfg`, `fmt`), property access, bracket indexing,
//! calls, and `+` concatenation/addition on matching types. There is no user
//! code execution and no assignment.

use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::config::tree::ConfigNode;
use crate::config::value::Value;
use crate::context::Context;
use crate::error::EvalError;
use crate::logging::color;

/// Maximum number of times a directive may expand into another directive
/// before evaluation is aborted.
pub const MAX_DIRECTIVE_DEPTH: usize = 16;

/// Matches one `{{ expr }}` interpolation span (non-greedy body).
static INTERP_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"\{\{(.*?)\}\}").expect("interpolation pattern is valid")
});

/// Name bindings available to an expression.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    ctx: &'a Context,
    cfg: Option<&'a Arc<ConfigNode>>,
}

impl<'a> Scope<'a> {
    /// A scope without a config binding, used while the tree is still being
    /// resolved. `cfg` evaluates to an undefined name here.
    #[must_use]
    pub const fn new(ctx: &'a Context) -> Self {
        Self { ctx, cfg: None }
    }

    /// A scope with `cfg` bound to a resolved tree root.
    #[must_use]
    pub const fn with_cfg(ctx: &'a Context, cfg: &'a Arc<ConfigNode>) -> Self {
        Self { ctx, cfg: Some(cfg) }
    }

    /// One-line snapshot of the name bindings, for failure logs.
    fn describe_bindings(&self) -> String {
        self.cfg.map_or_else(
            || "cfg unbound".to_string(),
            |node| match node.as_dict() {
                Ok(map) => {
                    let keys: Vec<&str> = map.keys().map(String::as_str).collect();
                    format!("cfg keys [{}]", keys.join(", "))
                }
                Err(_) => format!("cfg bound to a {}", node.kind_name()),
            },
        )
    }
}

/// Evaluate a single expression to a value.
///
/// # Errors
///
/// Returns an [`EvalError`] if the expression does not parse, references an
/// undefined name, reads an unset environment variable, or applies an
/// operator to mismatched types.
pub fn eval_expr(source: &str, scope: &Scope) -> Result<Value, EvalError> {
    let tokens = lex(source)?;
    let expr = Parser::new(source, tokens).parse()?;
    match evaluate(&expr, scope)? {
        Evaluated::Value(value) => Ok(value),
        other => Err(EvalError::Type(format!(
            "expression '{source}' evaluated to {} instead of a value",
            other.describe()
        ))),
    }
}

/// Whether a string is a whole-string directive of the form `(( expr ))`.
#[must_use]
pub fn is_directive(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.len() > 4 && trimmed.starts_with("((") && trimmed.ends_with("))")
}

/// Replace every whole-string `(( expr ))` directive in the document with its
/// evaluated value.
///
/// A directive may evaluate to another directive; expansion repeats up to
/// [`MAX_DIRECTIVE_DEPTH`] times before failing with
/// [`EvalError::RecursionLimit`].
///
/// # Errors
///
/// Returns an [`EvalError`] if any directive fails to evaluate.
pub fn expand_directives(value: Value, scope: &Scope) -> Result<Value, EvalError> {
    match value {
        Value::String(text) if is_directive(&text) => expand_one(&text, scope),
        Value::List(items) => items
            .into_iter()
            .map(|item| expand_directives(item, scope))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        Value::Dict(map) => map
            .into_iter()
            .map(|(key, child)| Ok((key, expand_directives(child, scope)?)))
            .collect::<Result<_, _>>()
            .map(Value::Dict),
        other => Ok(other),
    }
}

fn expand_one(directive: &str, scope: &Scope) -> Result<Value, EvalError> {
    let mut current = directive.trim().to_string();
    for _ in 0..MAX_DIRECTIVE_DEPTH {
        let trimmed = current.trim();
        let inner = trimmed
            .strip_prefix("((")
            .and_then(|rest| rest.strip_suffix("))"))
            .unwrap_or(trimmed);
        let result = eval_expr(inner.trim(), scope).inspect_err(|err| {
            tracing::error!(
                "failed to evaluate directive '(( {} ))' ({}): {err}",
                inner.trim(),
                scope.describe_bindings()
            );
        })?;
        match result {
            Value::String(text) if is_directive(&text) => current = text,
            // A directive result may itself contain nested directives in
            // list or dict position.
            other => return expand_directives(other, scope),
        }
    }
    Err(EvalError::RecursionLimit {
        expr: directive.trim().to_string(),
        limit: MAX_DIRECTIVE_DEPTH,
    })
}

/// Render every `{{ expr }}` span inside every string of the document.
///
/// Scalars render bare (no quotes); lists and dicts render as compact JSON.
/// Strings without an interpolation span pass through untouched.
///
/// # Errors
///
/// Returns an [`EvalError`] if any embedded expression fails to evaluate.
pub fn interpolate(value: Value, scope: &Scope) -> Result<Value, EvalError> {
    match value {
        Value::String(text) => render(&text, scope).map(Value::String),
        Value::List(items) => items
            .into_iter()
            .map(|item| interpolate(item, scope))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        Value::Dict(map) => map
            .into_iter()
            .map(|(key, child)| Ok((key, interpolate(child, scope)?)))
            .collect::<Result<_, _>>()
            .map(Value::Dict),
        other => Ok(other),
    }
}

/// Render the `{{ expr }}` spans of a single string. Used for config values
/// during the load pipeline and for template file content at deploy time.
///
/// # Errors
///
/// Returns an [`EvalError`] if any embedded expression fails to evaluate.
pub fn render_str(text: &str, scope: &Scope) -> Result<String, EvalError> {
    render(text, scope)
}

fn render(text: &str, scope: &Scope) -> Result<String, EvalError> {
    if !text.contains("{{") {
        return Ok(text.to_string());
    }
    let mut out = String::with_capacity(text.len());
    let mut last_end = 0;
    for caps in INTERP_RE.captures_iter(text) {
        let whole = caps.get(0).map_or(0..0, |m| m.range());
        let expr = caps.get(1).map_or("", |m| m.as_str());
        out.push_str(text.get(last_end..whole.start).unwrap_or_default());
        let rendered = eval_expr(expr.trim(), scope).inspect_err(|err| {
            tracing::error!(
                "failed to evaluate '{{{{ {} }}}}' ({}): {err}",
                expr.trim(),
                scope.describe_bindings()
            );
        })?;
        out.push_str(&rendered.display_string());
        last_end = whole.end;
    }
    out.push_str(text.get(last_end..).unwrap_or_default());
    Ok(out)
}

// --- Lexer ---------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Int(i64),
    Float(f64),
    Dot,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Plus,
}

fn lex(source: &str) -> Result<Vec<Token>, EvalError> {
    let parse_err = |message: String| EvalError::Parse {
        expr: source.to_string(),
        message,
    };
    let mut tokens = Vec::new();
    let mut chars = source.chars().peekable();
    while let Some(&ch) = chars.peek() {
        match ch {
            c if c.is_whitespace() => {
                chars.next();
            }
            '.' => {
                chars.next();
                tokens.push(Token::Dot);
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '[' => {
                chars.next();
                tokens.push(Token::LBracket);
            }
            ']' => {
                chars.next();
                tokens.push(Token::RBracket);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            '+' => {
                chars.next();
                tokens.push(Token::Plus);
            }
            '\'' | '"' => {
                let quote = ch;
                chars.next();
                let mut text = String::new();
                loop {
                    match chars.next() {
                        Some(c) if c == quote => break,
                        Some('\\') => match chars.next() {
                            Some('n') => text.push('\n'),
                            Some('t') => text.push('\t'),
                            Some(c @ ('\\' | '\'' | '"')) => text.push(c),
                            Some(c) => {
                                return Err(parse_err(format!("unknown escape '\\{c}'")));
                            }
                            None => {
                                return Err(parse_err("unterminated string".to_string()));
                            }
                        },
                        Some(c) => text.push(c),
                        None => return Err(parse_err("unterminated string".to_string())),
                    }
                }
                tokens.push(Token::Str(text));
            }
            c if c.is_ascii_digit() => {
                let mut number = String::new();
                let mut is_float = false;
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_digit() {
                        number.push(c);
                        chars.next();
                    } else if c == '.' && !is_float {
                        // Only consume the dot as a decimal point when a
                        // digit follows; `1.foo` stays an int plus accessor.
                        let mut ahead = chars.clone();
                        ahead.next();
                        if ahead.peek().is_some_and(char::is_ascii_digit) {
                            is_float = true;
                            number.push(c);
                            chars.next();
                        } else {
                            break;
                        }
                    } else {
                        break;
                    }
                }
                let token = if is_float {
                    Token::Float(
                        number
                            .parse()
                            .map_err(|_| parse_err(format!("invalid number '{number}'")))?,
                    )
                } else {
                    Token::Int(
                        number
                            .parse()
                            .map_err(|_| parse_err(format!("invalid number '{number}'")))?,
                    )
                };
                tokens.push(token);
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        ident.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(ident));
            }
            c => return Err(parse_err(format!("unexpected character '{c}'"))),
        }
    }
    Ok(tokens)
}

// --- Parser --------------------------------------------------------------

#[derive(Debug, Clone)]
enum Expr {
    Lit(Value),
    Ident(String),
    Field(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    Call(Box<Expr>, Vec<Expr>),
    Add(Box<Expr>, Box<Expr>),
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str, tokens: Vec<Token>) -> Self {
        Self {
            source,
            tokens,
            pos: 0,
        }
    }

    fn error(&self, message: String) -> EvalError {
        EvalError::Parse {
            expr: self.source.to_string(),
            message,
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: &Token) -> Result<(), EvalError> {
        match self.next() {
            Some(ref token) if token == expected => Ok(()),
            Some(token) => Err(self.error(format!("expected {expected:?}, found {token:?}"))),
            None => Err(self.error(format!("expected {expected:?}, found end of input"))),
        }
    }

    fn parse(mut self) -> Result<Expr, EvalError> {
        let expr = self.parse_expr()?;
        match self.peek() {
            None => Ok(expr),
            Some(token) => Err(self.error(format!("trailing input at {token:?}"))),
        }
    }

    fn parse_expr(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.parse_postfix()?;
        while matches!(self.peek(), Some(Token::Plus)) {
            self.next();
            let right = self.parse_postfix()?;
            left = Expr::Add(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_postfix(&mut self) -> Result<Expr, EvalError> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek() {
                Some(Token::Dot) => {
                    self.next();
                    match self.next() {
                        Some(Token::Ident(name)) => {
                            expr = Expr::Field(Box::new(expr), name);
                        }
                        other => {
                            return Err(
                                self.error(format!("expected property name, found {other:?}"))
                            );
                        }
                    }
                }
                Some(Token::LBracket) => {
                    self.next();
                    let index = self.parse_expr()?;
                    self.expect(&Token::RBracket)?;
                    expr = Expr::Index(Box::new(expr), Box::new(index));
                }
                Some(Token::LParen) => {
                    self.next();
                    let mut args = Vec::new();
                    if !matches!(self.peek(), Some(Token::RParen)) {
                        loop {
                            args.push(self.parse_expr()?);
                            if matches!(self.peek(), Some(Token::Comma)) {
                                self.next();
                            } else {
                                break;
                            }
                        }
                    }
                    self.expect(&Token::RParen)?;
                    expr = Expr::Call(Box::new(expr), args);
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, EvalError> {
        match self.next() {
            Some(Token::Str(text)) => Ok(Expr::Lit(Value::String(text))),
            Some(Token::Int(number)) => Ok(Expr::Lit(Value::Int(number))),
            Some(Token::Float(number)) => Ok(Expr::Lit(Value::Float(number))),
            Some(Token::Ident(name)) => match name.as_str() {
                "true" => Ok(Expr::Lit(Value::Bool(true))),
                "false" => Ok(Expr::Lit(Value::Bool(false))),
                "null" => Ok(Expr::Lit(Value::Null)),
                _ => Ok(Expr::Ident(name)),
            },
            Some(Token::LParen) => {
                let expr = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                Ok(expr)
            }
            other => Err(self.error(format!("expected expression, found {other:?}"))),
        }
    }
}

// --- Interpreter ---------------------------------------------------------

/// Intermediate result of evaluating a subexpression. Namespaces and builtins
/// only exist mid-expression; a complete expression must end in a value.
enum Evaluated {
    Value(Value),
    Namespace(Namespace),
    Builtin(Builtin),
}

#[derive(Clone, Copy)]
enum Namespace {
    Ctx,
    Env,
    Cfg,
}

#[derive(Clone, Copy)]
enum Builtin {
    Fmt,
    CtxRel,
    CfgGet,
}

impl Evaluated {
    fn describe(&self) -> &'static str {
        match self {
            Self::Value(_) => "a value",
            Self::Namespace(Namespace::Ctx) => "the 'ctx' namespace",
            Self::Namespace(Namespace::Env) => "the 'env' namespace",
            Self::Namespace(Namespace::Cfg) => "the 'cfg' namespace",
            Self::Builtin(Builtin::Fmt) => "the 'fmt' function",
            Self::Builtin(Builtin::CtxRel) => "the 'ctx.rel' function",
            Self::Builtin(Builtin::CfgGet) => "the 'cfg.get' function",
        }
    }
}

impl Builtin {
    const fn name(self) -> &'static str {
        match self {
            Self::Fmt => "fmt",
            Self::CtxRel => "ctx.rel",
            Self::CfgGet => "cfg.get",
        }
    }
}

fn evaluate(expr: &Expr, scope: &Scope) -> Result<Evaluated, EvalError> {
    match expr {
        Expr::Lit(value) => Ok(Evaluated::Value(value.clone())),
        Expr::Ident(name) => match name.as_str() {
            "ctx" => Ok(Evaluated::Namespace(Namespace::Ctx)),
            "env" => Ok(Evaluated::Namespace(Namespace::Env)),
            "cfg" if scope.cfg.is_some() => Ok(Evaluated::Namespace(Namespace::Cfg)),
            "fmt" => Ok(Evaluated::Builtin(Builtin::Fmt)),
            _ => Err(EvalError::Undefined(name.clone())),
        },
        Expr::Field(base, name) => eval_field(base, name, scope),
        Expr::Index(base, index) => eval_index(base, index, scope),
        Expr::Call(callee, args) => eval_call(callee, args, scope),
        Expr::Add(left, right) => eval_add(left, right, scope),
    }
}

fn eval_value(expr: &Expr, scope: &Scope) -> Result<Value, EvalError> {
    match evaluate(expr, scope)? {
        Evaluated::Value(value) => Ok(value),
        other => Err(EvalError::Type(format!(
            "expected a value, found {}",
            other.describe()
        ))),
    }
}

fn eval_field(base: &Expr, name: &str, scope: &Scope) -> Result<Evaluated, EvalError> {
    match evaluate(base, scope)? {
        Evaluated::Namespace(Namespace::Ctx) => ctx_property(name, scope),
        Evaluated::Namespace(Namespace::Env) => env_lookup(name, scope).map(Evaluated::Value),
        Evaluated::Namespace(Namespace::Cfg) => match name {
            "get" => Ok(Evaluated::Builtin(Builtin::CfgGet)),
            _ => cfg_lookup(name, scope).map(Evaluated::Value),
        },
        Evaluated::Value(Value::Dict(map)) => map
            .get(name)
            .cloned()
            .map(Evaluated::Value)
            .ok_or_else(|| EvalError::Undefined(name.to_string())),
        other => Err(EvalError::Type(format!(
            "cannot access '.{name}' on {}",
            other.describe()
        ))),
    }
}

fn eval_index(base: &Expr, index: &Expr, scope: &Scope) -> Result<Evaluated, EvalError> {
    let base = evaluate(base, scope)?;
    let index = eval_value(index, scope)?;
    match (base, index) {
        (Evaluated::Namespace(Namespace::Env), Value::String(name)) => {
            env_lookup(&name, scope).map(Evaluated::Value)
        }
        (Evaluated::Namespace(Namespace::Cfg), Value::String(key)) => {
            cfg_lookup(&key, scope).map(Evaluated::Value)
        }
        (Evaluated::Value(Value::Dict(map)), Value::String(key)) => map
            .get(&key)
            .cloned()
            .map(Evaluated::Value)
            .ok_or(EvalError::Undefined(key)),
        (Evaluated::Value(Value::List(items)), Value::Int(index)) => {
            let length = items.len();
            usize::try_from(index)
                .ok()
                .and_then(|i| items.into_iter().nth(i))
                .map(Evaluated::Value)
                .ok_or_else(|| {
                    EvalError::Type(format!("index {index} out of range for list of {length}"))
                })
        }
        (base, index) => Err(EvalError::Type(format!(
            "cannot index {} with {}",
            base.describe(),
            index.type_name()
        ))),
    }
}

fn eval_call(callee: &Expr, args: &[Expr], scope: &Scope) -> Result<Evaluated, EvalError> {
    let builtin = match evaluate(callee, scope)? {
        Evaluated::Builtin(builtin) => builtin,
        other => return Err(EvalError::NotCallable(other.describe().to_string())),
    };
    let args = args
        .iter()
        .map(|arg| eval_value(arg, scope))
        .collect::<Result<Vec<_>, _>>()?;
    let invalid = |message: String| EvalError::InvalidArgs {
        callee: builtin.name().to_string(),
        message,
    };

    match builtin {
        Builtin::Fmt => {
            if args.is_empty() || args.len() > 3 {
                return Err(invalid(format!(
                    "expected 1 to 3 arguments, got {}",
                    args.len()
                )));
            }
            let mut strings = Vec::with_capacity(args.len());
            for arg in &args {
                match arg.as_str() {
                    Some(text) => strings.push(text),
                    None => {
                        return Err(invalid(format!(
                            "expected string arguments, got {}",
                            arg.type_name()
                        )));
                    }
                }
            }
            let text = strings.first().copied().unwrap_or_default();
            let fg = strings.get(1).copied();
            let font = strings.get(2).copied();
            Ok(Evaluated::Value(Value::String(color::fmt(text, fg, font))))
        }
        Builtin::CtxRel => match args.as_slice() {
            [Value::String(path)] => {
                let resolved = scope.ctx.rel(path)?;
                Ok(Evaluated::Value(Value::String(
                    resolved.display().to_string(),
                )))
            }
            _ => Err(invalid("expected a single string path".to_string())),
        },
        Builtin::CfgGet => match args.as_slice() {
            [Value::String(key)] => cfg_lookup(key, scope).map(Evaluated::Value),
            [Value::String(key), default] => match cfg_lookup(key, scope) {
                Ok(value) => Ok(Evaluated::Value(value)),
                Err(EvalError::Undefined(_)) => Ok(Evaluated::Value(default.clone())),
                Err(err) => Err(err),
            },
            _ => Err(invalid(
                "expected a string key and optional default".to_string(),
            )),
        },
    }
}

fn eval_add(left: &Expr, right: &Expr, scope: &Scope) -> Result<Evaluated, EvalError> {
    let left = eval_value(left, scope)?;
    let right = eval_value(right, scope)?;
    let result = match (left, right) {
        (Value::String(a), Value::String(b)) => Value::String(a + &b),
        (Value::Int(a), Value::Int(b)) => Value::Int(a.wrapping_add(b)),
        (Value::Float(a), Value::Float(b)) => Value::Float(a + b),
        (left, right) => {
            return Err(EvalError::Type(format!(
                "cannot add {} and {}",
                left.type_name(),
                right.type_name()
            )));
        }
    };
    Ok(Evaluated::Value(result))
}

fn ctx_property(name: &str, scope: &Scope) -> Result<Evaluated, EvalError> {
    let ctx = scope.ctx;
    let value = match name {
        "home" => Value::String(ctx.home.display().to_string()),
        "root" => Value::String(ctx.root.display().to_string()),
        "config_dir" => Value::String(ctx.config_dir.display().to_string()),
        "config_path" => Value::String(ctx.config_path.display().to_string()),
        "dry_run" => Value::Bool(ctx.dry_run),
        "has_gpu" => Value::Bool(ctx.has_gpu),
        "rel" => return Ok(Evaluated::Builtin(Builtin::CtxRel)),
        _ => return Err(EvalError::Undefined(format!("ctx.{name}"))),
    };
    Ok(Evaluated::Value(value))
}

fn env_lookup(name: &str, scope: &Scope) -> Result<Value, EvalError> {
    scope
        .ctx
        .env_var(name)
        .map(|text| Value::String(text.to_string()))
        .ok_or_else(|| EvalError::MissingEnv(name.to_string()))
}

fn cfg_lookup(key: &str, scope: &Scope) -> Result<Value, EvalError> {
    let node = scope
        .cfg
        .ok_or_else(|| EvalError::Undefined("cfg".to_string()))?;
    // Parent-chain lookup, so a scope bound to a subtree still sees keys
    // declared by enclosing scopes.
    node.getp(key)
        .map(|found| found.to_value())
        .ok_or_else(|| EvalError::Undefined(format!("cfg['{key}']")))
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::config::merge::MergeOptions;
    use crate::config::{normalize, resolve};
    use crate::context;

    fn eval_in(source: &str, dir: &std::path::Path) -> Result<Value, EvalError> {
        let ctx = context::fixture(dir);
        eval_expr(source, &Scope::new(&ctx))
    }

    fn eval_str(source: &str) -> Value {
        let dir = tempfile::tempdir().unwrap();
        eval_in(source, dir.path()).unwrap()
    }

    fn cfg_tree(source: &str) -> Arc<ConfigNode> {
        let value = Value::from_yaml_str(source, "test.yaml").unwrap();
        let resolved =
            resolve::resolve(normalize::normalize(value), MergeOptions::root()).unwrap();
        ConfigNode::build(&resolved).unwrap()
    }

    #[test]
    fn literals() {
        assert_eq!(eval_str("'hi'"), Value::String("hi".to_string()));
        assert_eq!(eval_str("42"), Value::Int(42));
        assert_eq!(eval_str("2.5"), Value::Float(2.5));
        assert_eq!(eval_str("true"), Value::Bool(true));
        assert_eq!(eval_str("null"), Value::Null);
    }

    #[test]
    fn string_escapes() {
        assert_eq!(
            eval_str(r"'a\'b\n'"),
            Value::String("a'b\n".to_string())
        );
        assert_eq!(eval_str(r#""say \"hi\"""#), Value::String("say \"hi\"".to_string()));
    }

    #[test]
    fn addition_requires_matching_types() {
        assert_eq!(eval_str("'a' + 'b'"), Value::String("ab".to_string()));
        assert_eq!(eval_str("1 + 2"), Value::Int(3));
        assert_eq!(eval_str("1.5 + 0.5"), Value::Float(2.0));

        let dir = tempfile::tempdir().unwrap();
        let err = eval_in("'a' + 1", dir.path()).unwrap_err();
        assert!(matches!(err, EvalError::Type(_)));
    }

    #[test]
    fn env_access_both_forms() {
        assert_eq!(
            eval_str("env.DEPLOY_USER"),
            Value::String("tester".to_string())
        );
        assert_eq!(
            eval_str("env['DEPLOY_USER']"),
            Value::String("tester".to_string())
        );

        let dir = tempfile::tempdir().unwrap();
        let err = eval_in("env.NOPE", dir.path()).unwrap_err();
        assert!(matches!(err, EvalError::MissingEnv(name) if name == "NOPE"));
    }

    #[test]
    fn ctx_properties() {
        let dir = tempfile::tempdir().unwrap();
        let home = eval_in("ctx.home", dir.path()).unwrap();
        assert_eq!(
            home.as_str().unwrap(),
            dir.path().join("home").display().to_string()
        );
        assert_eq!(eval_in("ctx.dry_run", dir.path()).unwrap(), Value::Bool(false));
        assert_eq!(eval_in("ctx.has_gpu", dir.path()).unwrap(), Value::Bool(false));
    }

    #[test]
    fn ctx_rel_requires_existing_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("here.txt"), "x").unwrap();
        let resolved = eval_in("ctx.rel('here.txt')", dir.path()).unwrap();
        assert!(resolved.as_str().unwrap().ends_with("here.txt"));

        let err = eval_in("ctx.rel('missing.txt')", dir.path()).unwrap_err();
        assert!(matches!(err, EvalError::MissingPath(_)));
    }

    #[test]
    fn fmt_wraps_text_in_ansi_codes() {
        let out = eval_str("fmt('hello', 'red')");
        let text = out.as_str().unwrap();
        assert!(text.contains("hello"));
        assert!(text.starts_with('\x1b'));
    }

    #[test]
    fn cfg_lookup_dotted_and_call_forms() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context::fixture(dir.path());
        let root = cfg_tree("app:\n  name: demo\n  port: 8080\n");
        let scope = Scope::with_cfg(&ctx, &root);

        assert_eq!(
            eval_expr("cfg['app.name']", &scope).unwrap(),
            Value::String("demo".to_string())
        );
        assert_eq!(
            eval_expr("cfg.get('app.port')", &scope).unwrap(),
            Value::Int(8080)
        );
        assert_eq!(
            eval_expr("cfg.get('app.missing', 'fallback')", &scope).unwrap(),
            Value::String("fallback".to_string())
        );
        let err = eval_expr("cfg['app.missing']", &scope).unwrap_err();
        assert!(matches!(err, EvalError::Undefined(_)));
    }

    #[test]
    fn cfg_is_undefined_without_a_tree() {
        let dir = tempfile::tempdir().unwrap();
        let err = eval_in("cfg.get('x')", dir.path()).unwrap_err();
        assert!(matches!(err, EvalError::Undefined(name) if name == "cfg"));
    }

    #[test]
    fn parse_errors_name_the_expression() {
        let dir = tempfile::tempdir().unwrap();
        let err = eval_in("1 +", dir.path()).unwrap_err();
        assert!(matches!(err, EvalError::Parse { ref expr, .. } if expr == "1 +"));

        let err = eval_in("'unterminated", dir.path()).unwrap_err();
        assert!(matches!(err, EvalError::Parse { .. }));
    }

    #[test]
    fn namespaces_are_not_values() {
        let dir = tempfile::tempdir().unwrap();
        let err = eval_in("env", dir.path()).unwrap_err();
        assert!(matches!(err, EvalError::Type(_)));

        let err = eval_in("ctx.home('x')", dir.path()).unwrap_err();
        assert!(matches!(err, EvalError::NotCallable(_)));
    }

    #[test]
    fn expand_replaces_whole_string_directives() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context::fixture(dir.path());
        let scope = Scope::new(&ctx);

        let value = Value::from_yaml_str(
            "user: (( env.DEPLOY_USER ))\nliteral: 'prefix (( env.DEPLOY_USER ))'\n",
            "test.yaml",
        )
        .unwrap();
        let expanded = expand_directives(value, &scope).unwrap();
        assert_eq!(
            expanded.get("user").unwrap().as_str().unwrap(),
            "tester"
        );
        // Not a whole-string directive, so it is left for interpolation.
        assert_eq!(
            expanded.get("literal").unwrap().as_str().unwrap(),
            "prefix (( env.DEPLOY_USER ))"
        );
    }

    #[test]
    fn expand_recursion_is_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context::fixture(dir.path());
        ctx.env.insert(
            "LOOP".to_string(),
            "(( env['LOOP'] ))".to_string(),
        );
        let scope = Scope::new(&ctx);

        let err = expand_one("(( env['LOOP'] ))", &scope).unwrap_err();
        assert!(matches!(
            err,
            EvalError::RecursionLimit { limit, .. } if limit == MAX_DIRECTIVE_DEPTH
        ));
    }

    #[test]
    fn interpolation_renders_spans_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context::fixture(dir.path());
        let root = cfg_tree("app:\n  name: demo\n  count: 3\n");
        let scope = Scope::with_cfg(&ctx, &root);

        let value = Value::String(
            "deploy {{ cfg.get('app.name') }} x{{ cfg.get('app.count') }} for {{ env.DEPLOY_USER }}"
                .to_string(),
        );
        let rendered = interpolate(value, &scope).unwrap();
        assert_eq!(
            rendered.as_str().unwrap(),
            "deploy demo x3 for tester"
        );
    }

    #[test]
    fn interpolation_leaves_plain_strings_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context::fixture(dir.path());
        let scope = Scope::new(&ctx);
        let value = Value::String("no spans { here }".to_string());
        assert_eq!(
            interpolate(value, &scope).unwrap().as_str().unwrap(),
            "no spans { here }"
        );
    }

    #[test]
    fn interpolation_errors_propagate() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context::fixture(dir.path());
        let scope = Scope::new(&ctx);
        let value = Value::String("hi {{ env.NOPE }}".to_string());
        let err = interpolate(value, &scope).unwrap_err();
        assert!(matches!(err, EvalError::MissingEnv(_)));
    }

    #[test]
    fn binding_snapshot_names_the_bound_cfg_keys() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context::fixture(dir.path());
        assert_eq!(Scope::new(&ctx).describe_bindings(), "cfg unbound");

        let tree = cfg_tree("{editor: vim, shell: zsh}");
        let summary = Scope::with_cfg(&ctx, &tree).describe_bindings();
        assert_eq!(summary, "cfg keys [editor, shell]");

        let leaf = tree.get("editor").unwrap();
        let summary = Scope::with_cfg(&ctx, &leaf).describe_bindings();
        assert_eq!(summary, "cfg bound to a string");
    }
}
