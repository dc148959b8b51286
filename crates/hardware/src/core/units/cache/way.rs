//! Cache way storage.
//!
//! One way holds, per line, a tag, a valid bit and `nwords` data words. The
//! arrays are plain storage; every write is decided by the controller and
//! applied at the clock edge.

/// Tag, valid and data arrays of one way.
#[derive(Clone, Debug)]
pub struct Way {
    nwords: usize,
    tags: Vec<u32>,
    valid: Vec<bool>,
    data: Vec<u32>,
}

impl Way {
    /// Creates an empty way of `nlines` lines of `nwords` words.
    pub fn new(nlines: usize, nwords: usize) -> Self {
        Self {
            nwords,
            tags: vec![0; nlines],
            valid: vec![false; nlines],
            data: vec![0; nlines * nwords],
        }
    }

    /// Stored tag of `line`.
    #[inline]
    pub fn tag(&self, line: u32) -> u32 {
        self.tags[line as usize]
    }

    /// Valid bit of `line`.
    #[inline]
    pub fn is_valid(&self, line: u32) -> bool {
        self.valid[line as usize]
    }

    /// Data word at `offset` of `line`.
    #[inline]
    pub fn word(&self, line: u32, offset: u32) -> u32 {
        self.data[line as usize * self.nwords + offset as usize]
    }

    pub(super) fn write_tag(&mut self, line: u32, tag: u32) {
        self.tags[line as usize] = tag;
    }

    pub(super) fn write_valid(&mut self, line: u32, valid: bool) {
        self.valid[line as usize] = valid;
    }

    pub(super) fn write_word(&mut self, line: u32, offset: u32, value: u32) {
        self.data[line as usize * self.nwords + offset as usize] = value;
    }

    pub(super) fn invalidate_all(&mut self) {
        self.valid.fill(false);
    }

    /// Number of valid lines.
    pub fn valid_lines(&self) -> usize {
        self.valid.iter().filter(|&&v| v).count()
    }
}
