//! Rotation through the configured login names.

/// Index into the candidate username list.
///
/// Survives reconnects; only an identity-conflict kick moves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentityCursor {
    index: usize,
    len: usize,
}

impl IdentityCursor {
    /// Cursor over `len` candidates, starting at the first.
    ///
    /// `len` is clamped to 1 so the cursor always points somewhere; settings
    /// validation already rejects an empty list.
    pub fn new(len: usize) -> Self {
        Self { index: 0, len: len.max(1) }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Step to the next candidate, wrapping to the first after the last.
    pub fn advance(&mut self) -> usize {
        self.index = (self.index + 1) % self.len;
        self.index
    }

    /// The candidate the cursor points at.
    pub fn current<'a>(&self, names: &'a [String]) -> &'a str {
        names.get(self.index).map(String::as_str).unwrap_or_default()
    }
}
