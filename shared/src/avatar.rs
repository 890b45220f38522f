//! Deterministic placeholder artwork for owners without an image.
//!
//! The owner identifier is hashed with CRC32, the hash seeds a 32-bit linear
//! congruential generator, and the generator fills the left half of a 5×5 grid
//! which is mirrored onto the right half. Three colors (background, foreground,
//! accent) are derived from the same stream.

use std::collections::HashMap;

use crate::colors::hsl_to_rgb;

pub const AVATAR_SIZE: usize = 5;

const LCG_MULTIPLIER: u32 = 1_664_525;
const LCG_INCREMENT: u32 = 1_013_904_223;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvatarPixel {
    Background,
    Foreground,
    Accent,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Avatar {
    /// Row-major, `AVATAR_SIZE * AVATAR_SIZE` entries.
    pub pixels: [AvatarPixel; AVATAR_SIZE * AVATAR_SIZE],
    pub background: (u8, u8, u8),
    pub foreground: (u8, u8, u8),
    pub accent: (u8, u8, u8),
}

struct Lcg(u32);

impl Lcg {
    fn next(&mut self) -> u32 {
        self.0 = self.0.wrapping_mul(LCG_MULTIPLIER).wrapping_add(LCG_INCREMENT);
        self.0
    }

    /// Uniform float in [0, 1).
    fn next_unit(&mut self) -> f64 {
        (self.next() >> 8) as f64 / (1u32 << 24) as f64
    }
}

impl Avatar {
    pub fn generate(seed: &str) -> Self {
        let mut rng = Lcg(crc32fast::hash(seed.as_bytes()));

        let hue = rng.next_unit() * 360.0;
        let foreground = hsl_to_rgb(hue, 0.45 + rng.next_unit() * 0.4, 0.45 + rng.next_unit() * 0.15);
        let background = hsl_to_rgb(
            (hue + 180.0) % 360.0,
            0.25 + rng.next_unit() * 0.2,
            0.12 + rng.next_unit() * 0.1,
        );
        let accent = hsl_to_rgb(
            (hue + 90.0 + rng.next_unit() * 90.0) % 360.0,
            0.6 + rng.next_unit() * 0.3,
            0.6 + rng.next_unit() * 0.15,
        );

        let mut pixels = [AvatarPixel::Background; AVATAR_SIZE * AVATAR_SIZE];
        let half = AVATAR_SIZE.div_ceil(2);
        for row in 0..AVATAR_SIZE {
            for col in 0..half {
                let pixel = match rng.next() % 10 {
                    0..=3 => AvatarPixel::Background,
                    4..=8 => AvatarPixel::Foreground,
                    _ => AvatarPixel::Accent,
                };
                pixels[row * AVATAR_SIZE + col] = pixel;
                pixels[row * AVATAR_SIZE + (AVATAR_SIZE - 1 - col)] = pixel;
            }
        }

        Self {
            pixels,
            background,
            foreground,
            accent,
        }
    }

    pub fn pixel(&self, col: usize, row: usize) -> AvatarPixel {
        self.pixels[row * AVATAR_SIZE + col]
    }

    pub fn color_of(&self, pixel: AvatarPixel) -> (u8, u8, u8) {
        match pixel {
            AvatarPixel::Background => self.background,
            AvatarPixel::Foreground => self.foreground,
            AvatarPixel::Accent => self.accent,
        }
    }
}

/// Memoizes generated avatars by seed string.
#[derive(Debug, Default)]
pub struct AvatarCache {
    entries: HashMap<String, Avatar>,
}

impl AvatarCache {
    pub fn get_or_generate(&mut self, seed: &str) -> &Avatar {
        if !self.entries.contains_key(seed) {
            self.entries.insert(seed.to_string(), Avatar::generate(seed));
        }
        &self.entries[seed]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
