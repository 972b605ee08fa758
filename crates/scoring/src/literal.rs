//! Lenient parser for Python-literal structures (`{'a': None, 'b': True}`),
//! which LLMs frequently emit in place of JSON.

use serde_json::{Map, Number, Value};

/// Nesting limit, same as serde_json's recursion limit.
const MAX_DEPTH: usize = 128;

/// Parse a Python-literal string into a JSON value. Returns `None` on any
/// syntax error, trailing input, or nesting deeper than `MAX_DEPTH`.
pub fn parse_python_literal(input: &str) -> Option<Value> {
    let mut parser = Parser {
        chars: input.chars().collect(),
        pos: 0,
        depth: 0,
    };
    let value = parser.value()?;
    parser.skip_ws();
    if parser.pos == parser.chars.len() {
        Some(value)
    } else {
        None
    }
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        self.skip_ws();
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn value(&mut self) -> Option<Value> {
        self.skip_ws();
        match self.peek()? {
            '{' => self.nested(Self::dict),
            '[' => self.nested(|p| p.sequence('[', ']')),
            '(' => self.nested(|p| p.sequence('(', ')')),
            '\'' | '"' => self.string().map(Value::String),
            c if c == '-' || c == '+' || c == '.' || c.is_ascii_digit() => self.number(),
            c if c.is_alphabetic() => self.keyword(),
            _ => None,
        }
    }

    fn nested(&mut self, parse: impl FnOnce(&mut Self) -> Option<Value>) -> Option<Value> {
        if self.depth >= MAX_DEPTH {
            return None;
        }
        self.depth += 1;
        let value = parse(self);
        self.depth -= 1;
        value
    }

    fn dict(&mut self) -> Option<Value> {
        self.bump();
        let mut map = Map::new();
        loop {
            if self.eat('}') {
                return Some(Value::Object(map));
            }
            let key = match self.value()? {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => return None,
            };
            if !self.eat(':') {
                return None;
            }
            let value = self.value()?;
            map.insert(key, value);
            if !self.eat(',') {
                return self.eat('}').then_some(Value::Object(map));
            }
        }
    }

    fn sequence(&mut self, open: char, close: char) -> Option<Value> {
        debug_assert_eq!(self.peek(), Some(open));
        self.bump();
        let mut items = Vec::new();
        loop {
            if self.eat(close) {
                return Some(Value::Array(items));
            }
            items.push(self.value()?);
            if !self.eat(',') {
                return self.eat(close).then_some(Value::Array(items));
            }
        }
    }

    fn string(&mut self) -> Option<String> {
        let quote = self.bump()?;
        let mut out = String::new();
        loop {
            let c = self.bump()?;
            if c == quote {
                return Some(out);
            }
            if c != '\\' {
                out.push(c);
                continue;
            }
            match self.bump()? {
                'n' => out.push('\n'),
                't' => out.push('\t'),
                'r' => out.push('\r'),
                '0' => out.push('\0'),
                'u' => {
                    let hex: String = (0..4).filter_map(|_| self.bump()).collect();
                    let code = u32::from_str_radix(&hex, 16).ok()?;
                    out.push(char::from_u32(code)?);
                }
                other => out.push(other),
            }
        }
    }

    fn number(&mut self) -> Option<Value> {
        let start = self.pos;
        while matches!(
            self.peek(),
            Some(c) if c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E' | '_')
        ) {
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos]
            .iter()
            .filter(|c| **c != '_')
            .collect();
        if let Ok(i) = text.parse::<i64>() {
            return Some(Value::Number(i.into()));
        }
        let f: f64 = text.parse().ok()?;
        Number::from_f64(f).map(Value::Number)
    }

    fn keyword(&mut self) -> Option<Value> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        let word: String = self.chars[start..self.pos].iter().collect();
        match word.as_str() {
            "None" => Some(Value::Null),
            "True" => Some(Value::Bool(true)),
            "False" => Some(Value::Bool(false)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn python_list_of_dicts() {
        let v = parse_python_literal("[{'unit': '100', 'rent': 12.5, 'active': True, 'note': None}]").unwrap();
        assert_eq!(
            v,
            json!([{"unit": "100", "rent": 12.5, "active": true, "note": null}])
        );
    }

    #[test]
    fn tuples_and_trailing_commas() {
        assert_eq!(parse_python_literal("(1, 2,)").unwrap(), json!([1, 2]));
        assert_eq!(parse_python_literal("{'a': [1,],}").unwrap(), json!({"a": [1]}));
    }

    #[test]
    fn escapes_and_mixed_quotes() {
        assert_eq!(
            parse_python_literal(r#"{"it's": 'a \'quoted\' word'}"#).unwrap(),
            json!({"it's": "a 'quoted' word"})
        );
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_python_literal("not a literal").is_none());
        assert!(parse_python_literal("[1, 2").is_none());
        assert!(parse_python_literal("{'a' 1}").is_none());
        assert!(parse_python_literal("[1] trailing").is_none());
    }

    #[test]
    fn nesting_is_bounded() {
        let nested = |depth: usize| format!("{}1{}", "[".repeat(depth), "]".repeat(depth));
        assert!(parse_python_literal(&nested(MAX_DEPTH)).is_some());
        assert!(parse_python_literal(&nested(MAX_DEPTH + 1)).is_none());
        assert!(parse_python_literal(&nested(100_000)).is_none());

        let dicts = format!("{}1{}", "{'a': ".repeat(100_000), "}".repeat(100_000));
        assert!(parse_python_literal(&dicts).is_none());
    }
}
