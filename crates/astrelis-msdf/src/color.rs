use bitflags::bitflags;

bitflags! {
    /// Channel set an edge contributes to.
    ///
    /// Composite colours are unions of the primary channels, so
    /// `YELLOW == RED | GREEN`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct EdgeColor: u8 {
        const BLACK = 0;
        const RED = 1;
        const GREEN = 2;
        const YELLOW = 3;
        const BLUE = 4;
        const MAGENTA = 5;
        const CYAN = 6;
        const WHITE = 7;
    }
}

impl EdgeColor {
    /// Rotation used when colouring contours.
    pub const PALETTE: [EdgeColor; 3] = [EdgeColor::CYAN, EdgeColor::MAGENTA, EdgeColor::YELLOW];

    /// Channel indices in RGB order.
    pub const CHANNELS: [EdgeColor; 3] = [EdgeColor::RED, EdgeColor::GREEN, EdgeColor::BLUE];

    /// Whether this colour feeds channel `index` (0 = red, 1 = green, 2 = blue).
    #[inline]
    pub fn has_channel(self, index: usize) -> bool {
        Self::CHANNELS
            .get(index)
            .is_some_and(|channel| self.contains(*channel))
    }

    /// Applies a channel permutation: channel `i` of `self` moves to
    /// channel `permutation[i]`.
    pub fn permuted(self, permutation: [usize; 3]) -> EdgeColor {
        let mut out = EdgeColor::BLACK;
        for (from, to) in permutation.into_iter().enumerate() {
            if self.has_channel(from) {
                out |= Self::CHANNELS[to];
            }
        }
        out
    }
}
