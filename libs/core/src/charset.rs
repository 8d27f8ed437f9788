use std::collections::HashMap;

/// The characters printed on each module's flaps, in flap order.
///
/// Maps between flap indices and the characters they show.
///
/// # Examples
///
/// ```
/// use flapper_core::Charset;
///
/// let charset = Charset::default();
/// assert_eq!(Some(1), charset.index_of('a'));
/// assert_eq!(Some('z'), charset.flap(26));
/// assert_eq!(None, charset.index_of('!'));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Charset {
    flaps: Vec<char>,
    indices: HashMap<char, u32>,
}

impl Charset {
    /// The flaps of a standard 40-flap module.
    pub const DEFAULT: &'static str = " abcdefghijklmnopqrstuvwxyz0123456789.,'";

    /// Creates a character set from the characters on the flaps, starting at index 0.
    ///
    /// If a character appears more than once, the first flap showing it is used.
    pub fn new(flaps: &str) -> Self {
        let flaps: Vec<char> = flaps.chars().collect();
        let mut indices = HashMap::with_capacity(flaps.len());
        for (index, &c) in flaps.iter().enumerate() {
            let _ = indices.entry(c).or_insert(index as u32);
        }
        Charset { flaps, indices }
    }

    /// Returns the flap index showing `c`, if any.
    pub fn index_of(&self, c: char) -> Option<u32> {
        self.indices.get(&c).copied()
    }

    /// Returns the character on the flap at `index`, if there is one.
    pub fn flap(&self, index: u32) -> Option<char> {
        self.flaps.get(index as usize).copied()
    }

    /// Whether some flap shows `c`.
    pub fn contains(&self, c: char) -> bool {
        self.indices.contains_key(&c)
    }

    /// The character used for padding and in place of anything unsupported.
    ///
    /// A space if some flap shows one, otherwise the first flap.
    pub fn blank(&self) -> char {
        if self.contains(' ') {
            return ' ';
        }
        self.flaps.first().copied().unwrap_or(' ')
    }

    /// The number of flaps.
    pub fn len(&self) -> usize {
        self.flaps.len()
    }

    /// Whether there are no flaps at all.
    pub fn is_empty(&self) -> bool {
        self.flaps.is_empty()
    }

    /// Maps `text` to one flap index per module.
    ///
    /// Characters beyond `modules` are dropped and missing ones are filled with the
    /// [blank](Charset::blank) flap. Characters not in the set also map to the blank.
    pub fn flap_indices(&self, text: &str, modules: usize) -> Vec<u32> {
        let blank = self.index_of(self.blank()).unwrap_or(0);
        let mut indices: Vec<u32> = text
            .chars()
            .take(modules)
            .map(|c| self.index_of(c).unwrap_or(blank))
            .collect();
        indices.resize(modules, blank);
        indices
    }
}

impl Default for Charset {
    fn default() -> Self {
        Charset::new(Charset::DEFAULT)
    }
}
