use std::io::{self, Write};

use tokio::io::{AsyncBufRead, Lines};

/// Line-oriented reader for the interactive menus.
///
/// The chat loop borrows the same `Lines` so menu input and chat input share
/// one buffered stdin.
pub struct Prompt<R> {
    lines: Lines<R>,
}

impl<R> Prompt<R>
where
    R: AsyncBufRead + Unpin,
{
    pub fn new(lines: Lines<R>) -> Self {
        Self { lines }
    }

    pub fn lines_mut(&mut self) -> &mut Lines<R> {
        &mut self.lines
    }

    /// Next trimmed line, `None` at end of input.
    pub async fn read_line(&mut self) -> io::Result<Option<String>> {
        Ok(self
            .lines
            .next_line()
            .await?
            .map(|line| line.trim().to_string()))
    }

    pub async fn read_field(&mut self, label: &str) -> io::Result<Option<String>> {
        print!("{label}: ");
        io::stdout().flush()?;
        self.read_line().await
    }

    /// Reads until a line parses as an integer; `None` at end of input.
    pub async fn read_number(&mut self, label: &str) -> io::Result<Option<i64>> {
        loop {
            let Some(raw) = self.read_field(label).await? else {
                return Ok(None);
            };
            match raw.parse::<i64>() {
                Ok(value) => return Ok(Some(value)),
                Err(_) => println!("Please enter a number"),
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/prompt_tests.rs"]
mod tests;
