use std::fmt;

/// Identifier rules for a particular SQL flavor.
pub trait Dialect: fmt::Debug + Sync + Send {
    /// Opening and closing characters used to quote identifiers. None if the
    /// dialect doesn't quote.
    fn quote_chars(&self) -> Option<(char, char)>;

    /// Quote a single identifier, escaping embedded closing quotes by
    /// doubling them.
    fn quote_identifier(&self, ident: &str) -> String {
        match self.quote_chars() {
            Some((start, end)) => {
                let mut out = String::with_capacity(ident.len() + 2);
                out.push(start);
                for c in ident.chars() {
                    if c == end {
                        out.push(end);
                    }
                    out.push(c);
                }
                out.push(end);
                out
            }
            None => ident.to_string(),
        }
    }

    /// Quote each part and join them with `.`.
    fn quote_path(&self, parts: &[&str]) -> String {
        parts
            .iter()
            .map(|part| self.quote_identifier(part))
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// Leaves identifiers untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericDialect;

impl Dialect for GenericDialect {
    fn quote_chars(&self) -> Option<(char, char)> {
        None
    }
}

/// Standard double quoted identifiers.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnsiDialect;

impl Dialect for AnsiDialect {
    fn quote_chars(&self) -> Option<(char, char)> {
        Some(('"', '"'))
    }
}

/// SQL Server bracketed identifiers.
#[derive(Debug, Clone, Copy, Default)]
pub struct MssqlDialect;

impl Dialect for MssqlDialect {
    fn quote_chars(&self) -> Option<(char, char)> {
        Some(('[', ']'))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MysqlDialect;

impl Dialect for MysqlDialect {
    fn quote_chars(&self) -> Option<(char, char)> {
        Some(('`', '`'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoting() {
        assert_eq!("users", GenericDialect.quote_identifier("users"));
        assert_eq!("\"users\"", AnsiDialect.quote_identifier("users"));
        assert_eq!("[users]", MssqlDialect.quote_identifier("users"));
        assert_eq!("`users`", MysqlDialect.quote_identifier("users"));
    }

    #[test]
    fn closing_quote_is_doubled() {
        assert_eq!("\"a\"\"b\"", AnsiDialect.quote_identifier("a\"b"));
        assert_eq!("[a]]b]", MssqlDialect.quote_identifier("a]b"));
        // Opening bracket needs no escaping.
        assert_eq!("[a[b]", MssqlDialect.quote_identifier("a[b"));
    }

    #[test]
    fn path() {
        assert_eq!("[dbo].[users]", MssqlDialect.quote_path(&["dbo", "users"]));
        assert_eq!("a.b", GenericDialect.quote_path(&["a", "b"]));
    }
}
