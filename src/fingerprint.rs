//! SQL 语句指纹
//!
//! 把语句中的字面量（数字、字符串、位置参数、值列表）替换为 `?`，
//! 关键字统一为小写，得到可以作为聚合键的稳定指纹。
//! 指纹对自身再次计算指纹结果不变。

use md5::{Digest, Md5};

/// 可以作为字符串前缀的单字母标识符，如 `E'...'`、`B'...'`
const STRING_PREFIXES: [&str; 4] = ["e", "b", "x", "n"];

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    /// 已转为小写的标识符或关键字
    Word(String),
    Placeholder,
    Punct(char),
    Space,
}

/// 语句的指纹与哈希
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementDigest {
    pub statement_md5: String,
    pub statement_len: usize,
    pub fingerprint: String,
    pub fingerprint_md5: String,
    pub fingerprint_len: usize,
}

impl StatementDigest {
    /// 计算语句原文与指纹的 MD5 和字节长度
    pub fn of(statement: &str) -> Self {
        let fingerprint = fingerprint(statement);
        Self {
            statement_md5: md5_hex(statement),
            statement_len: statement.len(),
            fingerprint_md5: md5_hex(&fingerprint),
            fingerprint_len: fingerprint.len(),
            fingerprint,
        }
    }
}

/// 计算语句指纹
///
/// 先去掉所有双引号，再去除注释、折叠空白并替换字面量。
///
/// # 示例
///
/// ```
/// use pg_querylog_transform::fingerprint::fingerprint;
///
/// assert_eq!(fingerprint("SELECT * FROM t WHERE id IN (1, 2, 3)"), "select * from t where id in(?+)");
/// ```
pub fn fingerprint(statement: &str) -> String {
    let chars: Vec<char> = statement.chars().filter(|&c| c != '"').collect();
    let tokens = collapse_lists(tokenize(&chars));
    render(&tokens)
}

/// 小写十六进制 MD5，固定 32 个字符
pub fn md5_hex(text: &str) -> String {
    Md5::digest(text.as_bytes())
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

fn tokenize(chars: &[char]) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        match c {
            c if c.is_whitespace() => {
                i = skip_while(chars, i, char::is_whitespace);
                push_space(&mut tokens);
            }
            '-' if next == Some('-') => {
                i = skip_while(chars, i, |c| c != '\n');
                push_space(&mut tokens);
            }
            '/' if next == Some('*') => {
                i = skip_block_comment(chars, i + 2);
                push_space(&mut tokens);
            }
            '\'' => {
                i = skip_quoted(chars, i + 1, false);
                tokens.push(Token::Placeholder);
            }
            '$' => match dollar_literal_end(chars, i) {
                Some(end) => {
                    tokens.push(Token::Placeholder);
                    i = end;
                }
                None => {
                    tokens.push(Token::Punct('$'));
                    i += 1;
                }
            },
            '?' => {
                tokens.push(Token::Placeholder);
                i += 1;
            }
            c if c.is_ascii_digit() => {
                i = skip_number(chars, i);
                tokens.push(Token::Placeholder);
            }
            '.' if next.is_some_and(|n| n.is_ascii_digit()) && !follows_operand(&tokens) => {
                i = skip_number(chars, i);
                tokens.push(Token::Placeholder);
            }
            c if c.is_alphabetic() || c == '_' => {
                let end = skip_while(chars, i, is_word_char);
                let word = chars[i..end].iter().collect::<String>().to_lowercase();
                i = end;

                if chars.get(i) == Some(&'\'') && STRING_PREFIXES.contains(&word.as_str()) {
                    i = skip_quoted(chars, i + 1, word == "e");
                    tokens.push(Token::Placeholder);
                } else {
                    tokens.push(Token::Word(word));
                }
            }
            c => {
                tokens.push(Token::Punct(c));
                i += 1;
            }
        }
    }

    if tokens.last() == Some(&Token::Space) {
        tokens.pop();
    }
    tokens
}

#[inline]
fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

#[inline]
fn skip_while(chars: &[char], start: usize, pred: impl Fn(char) -> bool) -> usize {
    chars[start..]
        .iter()
        .position(|&c| !pred(c))
        .map_or(chars.len(), |offset| start + offset)
}

fn push_space(tokens: &mut Vec<Token>) {
    if matches!(tokens.last(), Some(last) if *last != Token::Space) {
        tokens.push(Token::Space);
    }
}

/// 前一个 token 紧贴着当前位置且是操作数时，`.` 是成员访问而不是小数点
fn follows_operand(tokens: &[Token]) -> bool {
    matches!(
        tokens.last(),
        Some(Token::Word(_) | Token::Placeholder | Token::Punct(')'))
    )
}

/// 块注释可以嵌套，未闭合时吞掉剩余内容
fn skip_block_comment(chars: &[char], start: usize) -> usize {
    let mut depth = 1;
    let mut i = start;
    while i < chars.len() {
        match (chars[i], chars.get(i + 1)) {
            ('*', Some('/')) => {
                depth -= 1;
                i += 2;
                if depth == 0 {
                    return i;
                }
            }
            ('/', Some('*')) => {
                depth += 1;
                i += 2;
            }
            _ => i += 1,
        }
    }
    chars.len()
}

/// 返回单引号字符串结束后的位置，`''` 为转义的引号
fn skip_quoted(chars: &[char], start: usize, backslash_escapes: bool) -> usize {
    let mut i = start;
    while i < chars.len() {
        match chars[i] {
            '\\' if backslash_escapes => i += 2,
            '\'' if chars.get(i + 1) == Some(&'\'') => i += 2,
            '\'' => return i + 1,
            _ => i += 1,
        }
    }
    chars.len()
}

/// `$1` 位置参数或 `$tag$...$tag$` 美元引用字符串
fn dollar_literal_end(chars: &[char], start: usize) -> Option<usize> {
    let first = *chars.get(start + 1)?;
    if first.is_ascii_digit() {
        return Some(skip_while(chars, start + 1, |c| c.is_ascii_digit()));
    }

    let tag_end = skip_while(chars, start + 1, |c| c.is_alphanumeric() || c == '_');
    if chars.get(tag_end) != Some(&'$') {
        return None;
    }

    let tag = &chars[start..=tag_end];
    let body_start = tag_end + 1;
    let end = chars[body_start..]
        .windows(tag.len())
        .position(|window| window == tag)
        .map_or(chars.len(), |offset| body_start + offset + tag.len());
    Some(end)
}

fn skip_number(chars: &[char], start: usize) -> usize {
    let is_hex = chars[start] == '0'
        && matches!(chars.get(start + 1), Some('x' | 'X'))
        && chars.get(start + 2).is_some_and(|c| c.is_ascii_hexdigit());
    if is_hex {
        return skip_while(chars, start + 2, |c| c.is_ascii_hexdigit());
    }

    let mut i = skip_while(chars, start, |c| c.is_ascii_digit());
    if chars.get(i) == Some(&'.') {
        i = skip_while(chars, i + 1, |c| c.is_ascii_digit());
    }
    if matches!(chars.get(i), Some('e' | 'E')) {
        let mut exponent = i + 1;
        if matches!(chars.get(exponent), Some('+' | '-')) {
            exponent += 1;
        }
        if chars.get(exponent).is_some_and(|c| c.is_ascii_digit()) {
            i = skip_while(chars, exponent, |c| c.is_ascii_digit());
        }
    }
    i
}

fn skip_spaces(tokens: &[Token], start: usize) -> usize {
    tokens[start.min(tokens.len())..]
        .iter()
        .position(|t| *t != Token::Space)
        .map_or(tokens.len(), |offset| start + offset)
}

/// 折叠 `IN (...)`、`VALUES (...), (...)` 和 `LIMIT ?, ?`
fn collapse_lists(tokens: Vec<Token>) -> Vec<Token> {
    let mut out = Vec::with_capacity(tokens.len());
    let mut i = 0;

    while i < tokens.len() {
        if let Token::Word(word) = &tokens[i] {
            let after = skip_spaces(&tokens, i + 1);
            match word.as_str() {
                "in" | "values" => {
                    let end = if word == "in" {
                        placeholder_group(&tokens, after)
                    } else {
                        placeholder_groups(&tokens, after)
                    };
                    if let Some(end) = end {
                        out.push(tokens[i].clone());
                        out.extend([
                            Token::Punct('('),
                            Token::Placeholder,
                            Token::Punct('+'),
                            Token::Punct(')'),
                        ]);
                        i = end;
                        continue;
                    }
                }
                "limit" => {
                    if let Some(end) = limit_pair(&tokens, after) {
                        out.extend([tokens[i].clone(), Token::Space, Token::Placeholder]);
                        i = end;
                        continue;
                    }
                }
                _ => {}
            }
        }

        out.push(tokens[i].clone());
        i += 1;
    }

    out
}

/// 只含占位符的括号组，返回右括号之后的位置
fn placeholder_group(tokens: &[Token], start: usize) -> Option<usize> {
    if tokens.get(start) != Some(&Token::Punct('(')) {
        return None;
    }

    let mut seen = false;
    for (offset, token) in tokens[start + 1..].iter().enumerate() {
        match token {
            Token::Placeholder => seen = true,
            Token::Punct(',' | '+') | Token::Space => {}
            Token::Punct(')') if seen => return Some(start + offset + 2),
            _ => return None,
        }
    }
    None
}

fn placeholder_groups(tokens: &[Token], start: usize) -> Option<usize> {
    let mut end = placeholder_group(tokens, start)?;
    loop {
        let comma = skip_spaces(tokens, end);
        if tokens.get(comma) != Some(&Token::Punct(',')) {
            break;
        }
        match placeholder_group(tokens, skip_spaces(tokens, comma + 1)) {
            Some(next) => end = next,
            None => break,
        }
    }
    Some(end)
}

fn limit_pair(tokens: &[Token], start: usize) -> Option<usize> {
    if tokens.get(start) != Some(&Token::Placeholder) {
        return None;
    }
    let comma = skip_spaces(tokens, start + 1);
    if tokens.get(comma) != Some(&Token::Punct(',')) {
        return None;
    }
    let second = skip_spaces(tokens, comma + 1);
    (tokens.get(second) == Some(&Token::Placeholder)).then_some(second + 1)
}

fn render(tokens: &[Token]) -> String {
    let mut out = String::with_capacity(tokens.len() * 4);
    for token in tokens {
        match token {
            Token::Word(word) => out.push_str(word),
            Token::Placeholder => out.push('?'),
            Token::Punct(c) => out.push(*c),
            Token::Space => out.push(' '),
        }
    }
    out
}
