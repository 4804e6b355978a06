//! Reading `log_format` templates out of nginx configuration.

use crate::error::{Error, Result};
use std::io::Read;

/// Extract a log format from nginx configuration.
///
/// Finds the `log_format <format_name> ...;` directive and concatenates its
/// string arguments the way nginx does, without separators. An optional
/// `escape=...` parameter is ignored. Comments and surrounding blocks are
/// skipped.
///
/// # Example
///
/// ```rust
/// use logload::nginx::extract_nginx_format;
///
/// let nginx_config = r#"
/// log_format main '$remote_addr - $remote_user [$time_local] "$request" '
///                 '$status $body_bytes_sent "$http_referer" '
///                 '"$http_user_agent"';
/// "#;
///
/// let format = extract_nginx_format(nginx_config.as_bytes(), "main")?;
/// assert_eq!(format, logload::COMBINED_FORMAT);
/// # Ok::<(), logload::Error>(())
/// ```
pub fn extract_nginx_format<R: Read>(mut nginx_config: R, format_name: &str) -> Result<String> {
    let mut text = String::new();
    nginx_config.read_to_string(&mut text)?;

    directives(&text)
        .into_iter()
        .find(|args| {
            args.first().map(String::as_str) == Some("log_format")
                && args.get(1).map(String::as_str) == Some(format_name)
        })
        .map(|args| {
            args.into_iter()
                .skip(2)
                .filter(|arg| !arg.starts_with("escape="))
                .collect::<String>()
        })
        .ok_or_else(|| Error::nginx_format_not_found(format_name))
}

/// Split configuration text into directives, each a list of unquoted
/// arguments. `;`, `{` and `}` end a directive.
fn directives(text: &str) -> Vec<Vec<String>> {
    let mut directives = Vec::new();
    let mut args: Vec<String> = Vec::new();
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            c if c.is_whitespace() => {}
            '#' => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            ';' | '{' | '}' => {
                if !args.is_empty() {
                    directives.push(std::mem::take(&mut args));
                }
            }
            '\'' | '"' => {
                let quote = ch;
                let mut arg = String::new();
                while let Some(c) = chars.next() {
                    match c {
                        '\\' => {
                            if let Some(escaped) = chars.next() {
                                // nginx only unescapes the quote character itself.
                                if escaped != quote {
                                    arg.push('\\');
                                }
                                arg.push(escaped);
                            }
                        }
                        c if c == quote => break,
                        c => arg.push(c),
                    }
                }
                args.push(arg);
            }
            _ => {
                let mut arg = String::from(ch);
                while let Some(&c) = chars.peek() {
                    if c.is_whitespace() || matches!(c, ';' | '{' | '}' | '#') {
                        break;
                    }
                    arg.push(c);
                    chars.next();
                }
                args.push(arg);
            }
        }
    }

    if !args.is_empty() {
        directives.push(args);
    }
    directives
}
