//! Checked integer arithmetic

use crate::exception::VmException;
use crate::instruction::Rounding;

/// Largest accepted shift amount
pub(crate) const MAX_SHIFT: i128 = 1023;

#[inline]
pub(crate) fn checked(value: Option<i128>) -> Result<i128, VmException> {
    value.ok_or(VmException::IntOverflow)
}

/// `x * 2^n`
pub(crate) fn shl(x: i128, n: u32) -> Result<i128, VmException> {
    if x == 0 {
        return Ok(0);
    }
    if n >= 127 {
        return Err(VmException::IntOverflow);
    }
    let shifted = x << n;
    if shifted >> n != x {
        return Err(VmException::IntOverflow);
    }
    Ok(shifted)
}

/// `floor(x / 2^n)`
pub(crate) fn shr(x: i128, n: u32) -> i128 {
    if n >= 127 {
        if x < 0 { -1 } else { 0 }
    } else {
        x >> n
    }
}

/// Shift amount popped from the stack, range-checked
pub(crate) fn shift_amount(n: i128) -> Result<u32, VmException> {
    if (0..=MAX_SHIFT).contains(&n) {
        Ok(n as u32)
    } else {
        Err(VmException::RangeCheck)
    }
}

/// Quotient and remainder of `x / y` under `rounding`; `x == q*y + r`
pub(crate) fn div_rem(x: i128, y: i128, rounding: Rounding) -> Result<(i128, i128), VmException> {
    if y == 0 || (x == i128::MIN && y == -1) {
        return Err(VmException::IntOverflow);
    }
    let mut q = x / y;
    let mut r = x % y;

    match rounding {
        Rounding::Ceil => {
            if r != 0 && (r < 0) == (y < 0) {
                q = checked(q.checked_add(1))?;
                r -= y;
            }
        }
        Rounding::Floor | Rounding::Nearest => {
            if r != 0 && (r < 0) != (y < 0) {
                q -= 1;
                r += y;
            }
            if rounding == Rounding::Nearest {
                // 0 <= r < y or y < r <= 0; compare 2r with y without doubling
                let round_up = if y > 0 { r >= y - r } else { r <= y - r };
                if round_up {
                    q = checked(q.checked_add(1))?;
                    r -= y;
                }
            }
        }
    }
    Ok((q, r))
}
