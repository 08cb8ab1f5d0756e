pub(crate) fn mul_div255_u16(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

pub(crate) fn mul_div255_u8(x: u16, y: u16) -> u8 {
    mul_div255_u16(x, y) as u8
}

/// Logical points to device pixels, rounded, floored at zero.
pub(crate) fn pt_to_px(pt: f64, scale: f32) -> u32 {
    let px = pt * f64::from(scale);
    if !px.is_finite() || px <= 0.0 {
        return 0;
    }
    px.round().min(f64::from(u32::MAX)) as u32
}

/// Signed logical points to signed device pixels, rounded.
pub(crate) fn pt_to_px_signed(pt: f64, scale: f32) -> i32 {
    let px = pt * f64::from(scale);
    if !px.is_finite() {
        return 0;
    }
    px.round().clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mul_div255_identity_and_zero() {
        assert_eq!(mul_div255_u8(255, 255), 255);
        assert_eq!(mul_div255_u8(255, 0), 0);
        assert_eq!(mul_div255_u8(128, 255), 128);
        assert_eq!(mul_div255_u8(128, 128), 64);
    }

    #[test]
    fn pt_to_px_rounds_and_floors() {
        assert_eq!(pt_to_px(10.0, 2.0), 20);
        assert_eq!(pt_to_px(10.4, 1.0), 10);
        assert_eq!(pt_to_px(10.5, 1.0), 11);
        assert_eq!(pt_to_px(-3.0, 2.0), 0);
        assert_eq!(pt_to_px(f64::NAN, 2.0), 0);
    }

    #[test]
    fn pt_to_px_signed_keeps_sign() {
        assert_eq!(pt_to_px_signed(-20.0, 2.0), -40);
        assert_eq!(pt_to_px_signed(7.5, 2.0), 15);
        assert_eq!(pt_to_px_signed(f64::INFINITY, 1.0), 0);
    }
}
