/// Deterministic owner color via CRC32 of the owner identifier.
/// Returns (r, g, b) from the top three bytes of the hash.
pub fn owner_color(owner: &str) -> (u8, u8, u8) {
    let [r, g, b, _] = crc32fast::hash(owner.as_bytes()).to_be_bytes();
    (r, g, b)
}

/// Parse `#rgb`, `#rrggbb` or `#rrggbbaa` (alpha ignored). Leading `#` is optional.
pub fn parse_hex_color(input: &str) -> Option<(u8, u8, u8)> {
    let hex = input.trim().trim_start_matches('#');
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        3 => {
            let mut out = [0u8; 3];
            for (slot, ch) in out.iter_mut().zip(hex.chars()) {
                let v = ch.to_digit(16)? as u8;
                *slot = v * 16 + v;
            }
            Some((out[0], out[1], out[2]))
        }
        6 | 8 => Some((
            channel(hex.get(0..2)?)?,
            channel(hex.get(2..4)?)?,
            channel(hex.get(4..6)?)?,
        )),
        _ => None,
    }
}

/// Convert HSL to RGB.
pub fn hsl_to_rgb(h: f64, s: f64, l: f64) -> (u8, u8, u8) {
    let to_byte = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    if s.abs() < f64::EPSILON {
        let v = to_byte(l);
        return (v, v, v);
    }

    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    let h = h.rem_euclid(360.0) / 360.0;
    (
        to_byte(hue_channel(p, q, h + 1.0 / 3.0)),
        to_byte(hue_channel(p, q, h)),
        to_byte(hue_channel(p, q, h - 1.0 / 3.0)),
    )
}

fn hue_channel(p: f64, q: f64, t: f64) -> f64 {
    let t = t.rem_euclid(1.0);
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}
