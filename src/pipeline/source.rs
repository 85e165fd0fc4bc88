//! Ordered line sources the producer reads from.

use anyhow::Result;
use std::collections::VecDeque;
use std::io::BufRead;

/// Yields raw lines in order; `Ok(None)` means end of input.
pub trait LineSource: Send {
    fn next_line(&mut self) -> Result<Option<String>>;
}

/// Lines of any buffered reader (a file, stdin, a cursor).
impl<B: BufRead + Send> LineSource for std::io::Lines<B> {
    fn next_line(&mut self) -> Result<Option<String>> {
        Ok(self.next().transpose()?)
    }
}

impl LineSource for std::vec::IntoIter<String> {
    fn next_line(&mut self) -> Result<Option<String>> {
        Ok(self.next())
    }
}

impl LineSource for VecDeque<String> {
    fn next_line(&mut self) -> Result<Option<String>> {
        Ok(self.pop_front())
    }
}

/// Build an in-memory source from string slices.
pub fn lines_from<I, S>(lines: I) -> VecDeque<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    lines.into_iter().map(Into::into).collect()
}
