//! ISAAC deterministic pseudo-random generator.
//!
//! A bit-exact implementation of Bob Jenkins' ISAAC (32-bit words) and
//! ISAAC-64 (64-bit words) with `RANDSIZL = 8`. A seed triple plus an
//! optional 256-word seed buffer reproduces the same infinite stream on
//! every platform, which is what seeded genome generation relies on.
//!
//! Results are consumed from the end of the results buffer towards the
//! start, exactly like the reference `rand()` macro.

use std::fmt;
use std::ops::{BitAnd, BitXor, Not, Rem, Shl, Shr};

use rand::distributions::{Distribution, Standard};

/// log2 of the state size.
pub const RANDSIZL: u32 = 8;
/// Number of words of working memory (and results per batch).
pub const RANDSIZ: usize = 1 << RANDSIZL;

/// The 32-bit generator used throughout the crate.
pub type RandomSource = Isaac<u32>;

/// The 64-bit variant.
pub type RandomSource64 = Isaac<u64>;

/// Machine word an ISAAC variant runs on.
///
/// The two implementations differ only in the golden-ratio constant, the
/// shift constants of the seeding scramble and the per-step mixing of `a`.
pub trait IsaacWord:
    Copy
    + Default
    + Eq
    + fmt::Debug
    + Send
    + Sync
    + BitAnd<Output = Self>
    + BitXor<Output = Self>
    + Not<Output = Self>
    + Rem<Output = Self>
    + Shl<u32, Output = Self>
    + Shr<u32, Output = Self>
    + 'static
{
    const ZERO: Self;
    const ONE: Self;
    const MAX: Self;
    /// Golden ratio seed for the eight scramble variables.
    const GOLDEN: Self;
    /// log2 of the word size in bytes; used by the `ind` lookup.
    const LOG_BYTES: u32;

    fn wrapping_add(self, rhs: Self) -> Self;
    fn wrapping_sub(self, rhs: Self) -> Self;

    /// Seeding scramble over `a..h`.
    fn mix(s: &mut [Self; 8]);

    /// Mixing applied to `a` at position `step % 4` of a generation pass.
    fn step_mix(a: Self, step: usize) -> Self;

    fn to_f64(self) -> f64;
    fn as_usize(self) -> usize;
    fn from_usize(n: usize) -> Self;
}

impl IsaacWord for u32 {
    const ZERO: Self = 0;
    const ONE: Self = 1;
    const MAX: Self = u32::MAX;
    const GOLDEN: Self = 0x9e37_79b9;
    const LOG_BYTES: u32 = 2;

    #[inline]
    fn wrapping_add(self, rhs: Self) -> Self {
        u32::wrapping_add(self, rhs)
    }

    #[inline]
    fn wrapping_sub(self, rhs: Self) -> Self {
        u32::wrapping_sub(self, rhs)
    }

    #[inline]
    fn mix(s: &mut [Self; 8]) {
        let [mut a, mut b, mut c, mut d, mut e, mut f, mut g, mut h] = *s;
        a ^= b << 11;
        d = d.wrapping_add(a);
        b = b.wrapping_add(c);
        b ^= c >> 2;
        e = e.wrapping_add(b);
        c = c.wrapping_add(d);
        c ^= d << 8;
        f = f.wrapping_add(c);
        d = d.wrapping_add(e);
        d ^= e >> 16;
        g = g.wrapping_add(d);
        e = e.wrapping_add(f);
        e ^= f << 10;
        h = h.wrapping_add(e);
        f = f.wrapping_add(g);
        f ^= g >> 4;
        a = a.wrapping_add(f);
        g = g.wrapping_add(h);
        g ^= h << 8;
        b = b.wrapping_add(g);
        h = h.wrapping_add(a);
        h ^= a >> 9;
        c = c.wrapping_add(h);
        a = a.wrapping_add(b);
        *s = [a, b, c, d, e, f, g, h];
    }

    #[inline]
    fn step_mix(a: Self, step: usize) -> Self {
        match step & 3 {
            0 => a ^ (a << 13),
            1 => a ^ (a >> 6),
            2 => a ^ (a << 2),
            _ => a ^ (a >> 16),
        }
    }

    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }

    #[inline]
    fn as_usize(self) -> usize {
        self as usize
    }

    #[inline]
    fn from_usize(n: usize) -> Self {
        n as u32
    }
}

impl IsaacWord for u64 {
    const ZERO: Self = 0;
    const ONE: Self = 1;
    const MAX: Self = u64::MAX;
    const GOLDEN: Self = 0x9e37_79b9_7f4a_7c13;
    const LOG_BYTES: u32 = 3;

    #[inline]
    fn wrapping_add(self, rhs: Self) -> Self {
        u64::wrapping_add(self, rhs)
    }

    #[inline]
    fn wrapping_sub(self, rhs: Self) -> Self {
        u64::wrapping_sub(self, rhs)
    }

    #[inline]
    fn mix(s: &mut [Self; 8]) {
        let [mut a, mut b, mut c, mut d, mut e, mut f, mut g, mut h] = *s;
        a = a.wrapping_sub(e);
        f ^= h >> 9;
        h = h.wrapping_add(a);
        b = b.wrapping_sub(f);
        g ^= a << 9;
        a = a.wrapping_add(b);
        c = c.wrapping_sub(g);
        h ^= b >> 23;
        b = b.wrapping_add(c);
        d = d.wrapping_sub(h);
        a ^= c << 15;
        c = c.wrapping_add(d);
        e = e.wrapping_sub(a);
        b ^= d >> 14;
        d = d.wrapping_add(e);
        f = f.wrapping_sub(b);
        c ^= e << 20;
        e = e.wrapping_add(f);
        g = g.wrapping_sub(c);
        d ^= f >> 17;
        f = f.wrapping_add(g);
        h = h.wrapping_sub(d);
        e ^= g << 14;
        g = g.wrapping_add(h);
        *s = [a, b, c, d, e, f, g, h];
    }

    #[inline]
    fn step_mix(a: Self, step: usize) -> Self {
        match step & 3 {
            0 => !(a ^ (a << 21)),
            1 => a ^ (a >> 5),
            2 => a ^ (a << 12),
            _ => a ^ (a >> 33),
        }
    }

    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }

    #[inline]
    fn as_usize(self) -> usize {
        self as usize
    }

    #[inline]
    fn from_usize(n: usize) -> Self {
        n as u64
    }
}

/// ISAAC generator state.
///
/// Not shareable across threads by design of the algorithm; give every
/// worker its own instance.
#[derive(Clone)]
pub struct Isaac<W: IsaacWord> {
    mem: [W; RANDSIZ],
    rsl: [W; RANDSIZ],
    /// Unread results left in `rsl`.
    count: usize,
    a: W,
    b: W,
    c: W,
}

impl<W: IsaacWord> fmt::Debug for Isaac<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Isaac")
            .field("count", &self.count)
            .field("a", &self.a)
            .field("b", &self.b)
            .field("c", &self.c)
            .finish_non_exhaustive()
    }
}

impl<W: IsaacWord> Default for Isaac<W> {
    fn default() -> Self {
        Self::new(W::ZERO, W::ZERO, W::ZERO)
    }
}

impl<W: IsaacWord> Isaac<W> {
    /// Create a generator seeded with `(a, b, c)` and an all-zero seed buffer.
    pub fn new(a: W, b: W, c: W) -> Self {
        Self::with_seed_buffer(a, b, c, None)
    }

    /// Create a generator seeded with `(a, b, c)` and an optional seed buffer.
    pub fn with_seed_buffer(a: W, b: W, c: W, buffer: Option<&[W; RANDSIZ]>) -> Self {
        let mut rng = Self {
            mem: [W::ZERO; RANDSIZ],
            rsl: [W::ZERO; RANDSIZ],
            count: 0,
            a: W::ZERO,
            b: W::ZERO,
            c: W::ZERO,
        };
        rng.seed(a, b, c, buffer);
        rng
    }

    /// Create a generator seeded from OS entropy.
    pub fn from_entropy() -> Self
    where
        Standard: Distribution<W>,
    {
        Self::new(rand::random(), rand::random(), rand::random())
    }

    /// Reseed in place. Identical arguments always yield an identical stream.
    pub fn seed(&mut self, a: W, b: W, c: W, buffer: Option<&[W; RANDSIZ]>) {
        self.rsl = buffer.copied().unwrap_or([W::ZERO; RANDSIZ]);
        self.a = a;
        self.b = b;
        self.c = c;
        self.init();
    }

    fn init(&mut self) {
        let mut s = [W::GOLDEN; 8];
        for _ in 0..4 {
            W::mix(&mut s);
        }

        for i in (0..RANDSIZ).step_by(8) {
            for (j, v) in s.iter_mut().enumerate() {
                *v = v.wrapping_add(self.rsl[i + j]);
            }
            W::mix(&mut s);
            self.mem[i..i + 8].copy_from_slice(&s);
        }

        // Second pass so every seed word affects every memory word
        for i in (0..RANDSIZ).step_by(8) {
            for (j, v) in s.iter_mut().enumerate() {
                *v = v.wrapping_add(self.mem[i + j]);
            }
            W::mix(&mut s);
            self.mem[i..i + 8].copy_from_slice(&s);
        }

        self.generate();
        self.count = RANDSIZ;
    }

    #[inline]
    fn ind(&self, x: W) -> W {
        self.mem[(x >> W::LOG_BYTES).as_usize() & (RANDSIZ - 1)]
    }

    /// Produce the next batch of `RANDSIZ` results.
    fn generate(&mut self) {
        const HALF: usize = RANDSIZ / 2;

        self.c = self.c.wrapping_add(W::ONE);
        let mut a = self.a;
        let mut b = self.b.wrapping_add(self.c);

        for i in 0..RANDSIZ {
            let x = self.mem[i];
            a = W::step_mix(a, i).wrapping_add(self.mem[(i + HALF) % RANDSIZ]);
            let y = self.ind(x).wrapping_add(a).wrapping_add(b);
            self.mem[i] = y;
            b = self.ind(y >> RANDSIZL).wrapping_add(x);
            self.rsl[i] = b;
        }

        self.a = a;
        self.b = b;
    }

    /// Next raw word.
    #[inline]
    pub fn next(&mut self) -> W {
        if self.count == 0 {
            self.generate();
            self.count = RANDSIZ;
        }
        self.count -= 1;
        self.rsl[self.count]
    }

    /// Next word in `[0, n)`. Returns `next()` unmodified when `n` is zero.
    #[inline]
    pub fn next_bounded(&mut self, n: W) -> W {
        let v = self.next();
        if n == W::ZERO { v } else { v % n }
    }

    /// Uniform index in `[0, n)`; `n` must be non-zero for the result to be an index.
    #[inline]
    pub fn next_index(&mut self, n: usize) -> usize {
        self.next_bounded(W::from_usize(n)).as_usize()
    }

    /// `lo + (next / MAX) * (hi - lo)`.
    #[inline]
    pub fn next_float(&mut self, lo: f64, hi: f64) -> f64 {
        let f = self.next().to_f64() / W::MAX.to_f64();
        lo + f * (hi - lo)
    }

    #[inline]
    pub fn next_float01(&mut self) -> f64 {
        self.next_float(0.0, 1.0)
    }

    #[inline]
    pub fn next_float11(&mut self) -> f64 {
        self.next_float(-1.0, 1.0)
    }

    /// Lowest bit of the next word.
    #[inline]
    pub fn next_bit(&mut self) -> bool {
        self.next() & W::ONE == W::ONE
    }

    /// Lowest byte of the next word.
    #[inline]
    pub fn next_byte(&mut self) -> u8 {
        (self.next().as_usize() & 0xff) as u8
    }

    /// Draw three words, suitable for seeding an independent child generator.
    pub fn next_seed(&mut self) -> (W, W, W) {
        (self.next(), self.next(), self.next())
    }
}

impl rand::RngCore for Isaac<u32> {
    fn next_u32(&mut self) -> u32 {
        self.next()
    }

    fn next_u64(&mut self) -> u64 {
        let lo = u64::from(self.next());
        let hi = u64::from(self.next());
        (hi << 32) | lo
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let bytes = self.next().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl rand::RngCore for Isaac<u64> {
    fn next_u32(&mut self) -> u32 {
        self.next() as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.next()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(8) {
            let bytes = self.next().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::{Rng, RngCore};

    #[test]
    fn test_reference_vector_zero_seed() {
        // randvect.txt prints the batch after the one produced by randinit,
        // starting at randrsl[0]; we read each batch from the top down.
        let mut rng = RandomSource::new(0, 0, 0);
        let draws: Vec<u32> = (0..512).map(|_| rng.next()).collect();

        assert_eq!(draws[511], 0xf650e4c8);
        assert_eq!(draws[510], 0xe448e96d);
        assert_eq!(draws[509], 0x98db2fb4);
        assert_eq!(draws[508], 0xf5fad54f);
    }

    #[test]
    fn test_reference_vector_zero_seed_64() {
        let mut rng = RandomSource64::new(0, 0, 0);
        let draws: Vec<u64> = (0..512).map(|_| rng.next()).collect();

        // Tail of the randinit batch, the start of the well-known Polyglot table.
        assert_eq!(draws[0], 0x9d39247e33776d41);
        assert_eq!(draws[1], 0x2af7398005aaa5c7);
        assert_eq!(draws[2], 0x44db015024623547);
        assert_eq!(draws[3], 0x9c15f73e62a76ae2);

        // randvect.txt for isaac64.
        assert_eq!(draws[511], 0x12a8f216af9418c2);
        assert_eq!(draws[510], 0xd4490ad526f14431);
        assert_eq!(draws[509], 0xb49c3b3995091a36);
        assert_eq!(draws[508], 0x5b45e522e4b1b4ef);
        assert_eq!(draws[507], 0xa1e9300cd8520548);
        assert_eq!(draws[506], 0x49787fef17af9924);
        assert_eq!(draws[505], 0x03219a39ee587a30);
        assert_eq!(draws[504], 0xebe9ea2adf4321c7);
    }

    #[test]
    fn test_identical_seeds_identical_streams() {
        let mut a = RandomSource::new(1, 2, 3);
        let mut b = RandomSource::new(1, 2, 3);
        for _ in 0..10_000 {
            assert_eq!(a.next(), b.next());
        }

        let mut a = RandomSource64::new(7, 8, 9);
        let mut b = RandomSource64::new(7, 8, 9);
        for _ in 0..10_000 {
            assert_eq!(a.next(), b.next());
        }
    }

    #[test]
    fn test_reseed_restarts_stream() {
        let mut rng = RandomSource::new(1, 2, 3);
        let first: Vec<u32> = (0..300).map(|_| rng.next()).collect();
        rng.seed(1, 2, 3, None);
        let second: Vec<u32> = (0..300).map(|_| rng.next()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_seed_buffer_changes_stream() {
        let mut buffer = [0u32; RANDSIZ];
        buffer[17] = 42;
        let mut plain = RandomSource::new(1, 2, 3);
        let mut buffered = RandomSource::with_seed_buffer(1, 2, 3, Some(&buffer));
        let same = (0..64).filter(|_| plain.next() == buffered.next()).count();
        assert!(same < 4);
    }

    #[test]
    fn test_different_seeds_differ() {
        let mut a = RandomSource::new(1, 2, 3);
        let mut b = RandomSource::new(1, 2, 4);
        let same = (0..1000).filter(|_| a.next() == b.next()).count();
        assert!(same < 5);
    }

    #[test]
    fn test_bounded_zero_is_raw() {
        let mut a = RandomSource::new(5, 5, 5);
        let mut b = RandomSource::new(5, 5, 5);
        for _ in 0..100 {
            assert_eq!(a.next_bounded(0), b.next());
        }
    }

    #[test]
    fn test_rng_core_interop() {
        let mut rng = RandomSource::new(11, 12, 13);
        for _ in 0..1000 {
            let v: f64 = rng.gen_range(-2.0..2.0);
            assert!((-2.0..2.0).contains(&v));
        }
        let mut bytes = [0u8; 13];
        rng.fill_bytes(&mut bytes);
        assert!(bytes.iter().any(|&b| b != 0));
    }

    proptest! {
        #[test]
        fn prop_bounded_in_range(seed in any::<(u32, u32, u32)>(), n in 1u32..10_000) {
            let mut rng = RandomSource::new(seed.0, seed.1, seed.2);
            for _ in 0..50 {
                prop_assert!(rng.next_bounded(n) < n);
            }
        }

        #[test]
        fn prop_float_in_range(seed in any::<(u64, u64, u64)>(), lo in -10.0f64..0.0, span in 0.001f64..10.0) {
            let mut rng = RandomSource64::new(seed.0, seed.1, seed.2);
            for _ in 0..50 {
                let v = rng.next_float(lo, lo + span);
                prop_assert!(v >= lo && v <= lo + span);
            }
        }
    }
}
