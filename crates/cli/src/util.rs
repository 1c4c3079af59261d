//! Command-line splitting for the CLI

use anyhow::{bail, Result};

/// Split a command line into program and arguments
///
/// Whitespace separates words; single or double quotes group them.
pub fn split_command(command: &str) -> Result<Vec<String>> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;

    for c in command.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                in_word = true;
            }
            None if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            None => {
                current.push(c);
                in_word = true;
            }
        }
    }

    if quote.is_some() {
        bail!("Unterminated quote in command: {}", command);
    }
    if in_word {
        words.push(current);
    }
    if words.is_empty() {
        bail!("Empty command");
    }
    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_command() {
        assert_eq!(
            split_command("cargo test --lib").unwrap(),
            vec!["cargo", "test", "--lib"]
        );
        assert_eq!(
            split_command(r#"sh -c 'echo "hi there"'"#).unwrap(),
            vec!["sh", "-c", r#"echo "hi there""#]
        );
        assert_eq!(split_command("echo ''").unwrap(), vec!["echo", ""]);
        assert!(split_command("   ").is_err());
        assert!(split_command("echo 'oops").is_err());
    }
}
