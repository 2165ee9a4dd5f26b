//! Evaluation of operations over statically known values
//!
//! Pure functions over literal operands only, reproducing the source type
//! system's numeric rules: promotion of small integer kinds to a machine
//! word before arithmetic, fixed-width wraparound, shift-count masking,
//! and sign- versus zero-extension by signedness. Asking for anything
//! outside the enumerated operators, cast targets, and operand shapes is
//! an unsupported-evaluation error, never a partial result.

use crate::ast::{BinaryOp, Literal, PrimitiveKind, UnaryOp};
use crate::error::{Error, Result};

/// Operand pair after binary numeric promotion
enum Promoted {
    Int(i32, i32),
    UInt(u32, u32),
    Long(i64, i64),
    ULong(u64, u64),
    Float(f32, f32),
    Double(f64, f64),
}

/// Single operand after unary numeric promotion (kinds below int widen to
/// int; everything else keeps its kind)
enum PromotedOne {
    Int(i32),
    UInt(u32),
    Long(i64),
    ULong(u64),
    Float(f32),
    Double(f64),
}

fn promote_one(literal: &Literal) -> Result<PromotedOne> {
    Ok(match literal {
        Literal::Float(v) => PromotedOne::Float(*v),
        Literal::Double(v) => PromotedOne::Double(*v),
        Literal::UInt(v) => PromotedOne::UInt(*v),
        Literal::Long(v) => PromotedOne::Long(*v),
        Literal::ULong(v) => PromotedOne::ULong(*v),
        other => match int_value(other) {
            Some(v) => PromotedOne::Int(v as i32),
            None => {
                return Err(Error::unsupported(format!(
                    "no numeric promotion for {}",
                    other
                )))
            }
        },
    })
}

/// Lossless integer value of a literal, with char treated as its code unit
fn int_value(literal: &Literal) -> Option<i128> {
    Some(match literal {
        Literal::Char(v) => (*v as u32 as u16) as i128,
        Literal::SByte(v) => *v as i128,
        Literal::Byte(v) => *v as i128,
        Literal::Short(v) => *v as i128,
        Literal::UShort(v) => *v as i128,
        Literal::Int(v) => *v as i128,
        Literal::UInt(v) => *v as i128,
        Literal::Long(v) => *v as i128,
        Literal::ULong(v) => *v as i128,
        _ => return None,
    })
}

fn float_value(literal: &Literal) -> Option<f64> {
    match literal {
        Literal::Float(v) => Some(*v as f64),
        Literal::Double(v) => Some(*v),
        other => int_value(other).map(|v| v as f64),
    }
}

/// Whether the literal's kind converts implicitly to ulong (unsigned kinds
/// and char); mixing ulong with a signed kind has no common type
fn fits_ulong(literal: &Literal) -> bool {
    matches!(
        literal,
        Literal::Byte(_)
            | Literal::UShort(_)
            | Literal::UInt(_)
            | Literal::ULong(_)
            | Literal::Char(_)
    )
}

/// Binary numeric promotion following the source type system: double >
/// float > ulong > long > uint > int, with operands below int widened to
/// int first and `uint` paired with a signed operand widening to long
fn promote_pair(left: &Literal, right: &Literal) -> Result<Promoted> {
    use Literal::*;

    let unsupported = || {
        Error::unsupported(format!(
            "no numeric promotion for operands {} and {}",
            left, right
        ))
    };

    if matches!(left, Double(_)) || matches!(right, Double(_)) {
        let l = float_value(left).ok_or_else(unsupported)?;
        let r = float_value(right).ok_or_else(unsupported)?;
        return Ok(Promoted::Double(l, r));
    }
    if matches!(left, Float(_)) || matches!(right, Float(_)) {
        let l = float_value(left).ok_or_else(unsupported)? as f32;
        let r = float_value(right).ok_or_else(unsupported)? as f32;
        return Ok(Promoted::Float(l, r));
    }

    let l = int_value(left).ok_or_else(unsupported)?;
    let r = int_value(right).ok_or_else(unsupported)?;

    if matches!(left, ULong(_)) || matches!(right, ULong(_)) {
        if !fits_ulong(left) || !fits_ulong(right) {
            return Err(unsupported());
        }
        return Ok(Promoted::ULong(l as u64, r as u64));
    }
    if matches!(left, Long(_)) || matches!(right, Long(_)) {
        return Ok(Promoted::Long(l as i64, r as i64));
    }
    if matches!(left, UInt(_)) || matches!(right, UInt(_)) {
        // uint paired with a signed operand has no common 32-bit type
        if matches!(left, SByte(_) | Short(_) | Int(_))
            || matches!(right, SByte(_) | Short(_) | Int(_))
        {
            return Ok(Promoted::Long(l as i64, r as i64));
        }
        return Ok(Promoted::UInt(l as u32, r as u32));
    }
    Ok(Promoted::Int(l as i32, r as i32))
}

/// Compute the literal result of a binary operation over two literals
pub fn eval_binary(op: BinaryOp, left: &Literal, right: &Literal) -> Result<Literal> {
    use Literal::*;

    // Boolean logic, including the non-short-circuit forms
    if let (Bool(l), Bool(r)) = (left, right) {
        return Ok(match op {
            BinaryOp::And | BinaryOp::BitAnd => Bool(*l && *r),
            BinaryOp::Or | BinaryOp::BitOr => Bool(*l || *r),
            BinaryOp::BitXor => Bool(*l != *r),
            BinaryOp::Eq => Bool(l == r),
            BinaryOp::Ne => Bool(l != r),
            _ => {
                return Err(Error::unsupported(format!(
                    "operator {} over booleans",
                    op.symbol()
                )))
            }
        });
    }

    // String concatenation and equality
    match (left, right) {
        (Str(l), Str(r)) => {
            return Ok(match op {
                BinaryOp::Add => Str(format!("{}{}", l, r)),
                BinaryOp::Eq => Bool(l == r),
                BinaryOp::Ne => Bool(l != r),
                _ => {
                    return Err(Error::unsupported(format!(
                        "operator {} over strings",
                        op.symbol()
                    )))
                }
            });
        }
        (Str(_), Null) | (Null, Str(_)) => {
            return Ok(match op {
                BinaryOp::Eq => Bool(false),
                BinaryOp::Ne => Bool(true),
                _ => {
                    return Err(Error::unsupported(format!(
                        "operator {} over a string and null",
                        op.symbol()
                    )))
                }
            });
        }
        (Null, Null) => {
            return Ok(match op {
                BinaryOp::Eq => Bool(true),
                BinaryOp::Ne => Bool(false),
                _ => {
                    return Err(Error::unsupported(format!(
                        "operator {} over nulls",
                        op.symbol()
                    )))
                }
            });
        }
        _ => {}
    }

    // Shifts promote the left operand alone; the count is masked to the
    // operand width, matching run-time behavior rather than mathematical
    // shifting
    if matches!(op, BinaryOp::Shl | BinaryOp::Shr) {
        let count = int_value(right).ok_or_else(|| {
            Error::unsupported(format!("shift count {} is not an integer", right))
        })? as u32;
        return Ok(match promote_one(left)? {
            PromotedOne::Int(l) => match op {
                BinaryOp::Shl => Int(l.wrapping_shl(count & 0x1F)),
                _ => Int(l.wrapping_shr(count & 0x1F)),
            },
            PromotedOne::UInt(l) => match op {
                BinaryOp::Shl => UInt(l.wrapping_shl(count & 0x1F)),
                _ => UInt(l.wrapping_shr(count & 0x1F)),
            },
            PromotedOne::Long(l) => match op {
                BinaryOp::Shl => Long(l.wrapping_shl(count & 0x3F)),
                _ => Long(l.wrapping_shr(count & 0x3F)),
            },
            PromotedOne::ULong(l) => match op {
                BinaryOp::Shl => ULong(l.wrapping_shl(count & 0x3F)),
                _ => ULong(l.wrapping_shr(count & 0x3F)),
            },
            _ => {
                return Err(Error::unsupported(format!(
                    "shift over non-integer operand {}",
                    left
                )))
            }
        });
    }

    macro_rules! int_arith {
        ($l:expr, $r:expr, $ctor:ident) => {
            match op {
                BinaryOp::Add => $ctor($l.wrapping_add($r)),
                BinaryOp::Sub => $ctor($l.wrapping_sub($r)),
                BinaryOp::Mul => $ctor($l.wrapping_mul($r)),
                BinaryOp::Div => {
                    if $r == 0 {
                        return Err(Error::unsupported("division by zero"));
                    }
                    $ctor($l.wrapping_div($r))
                }
                BinaryOp::Mod => {
                    if $r == 0 {
                        return Err(Error::unsupported("remainder by zero"));
                    }
                    $ctor($l.wrapping_rem($r))
                }
                BinaryOp::BitAnd => $ctor($l & $r),
                BinaryOp::BitOr => $ctor($l | $r),
                BinaryOp::BitXor => $ctor($l ^ $r),
                BinaryOp::Lt => Bool($l < $r),
                BinaryOp::Le => Bool($l <= $r),
                BinaryOp::Gt => Bool($l > $r),
                BinaryOp::Ge => Bool($l >= $r),
                BinaryOp::Eq => Bool($l == $r),
                BinaryOp::Ne => Bool($l != $r),
                _ => {
                    return Err(Error::unsupported(format!(
                        "operator {} over integers",
                        op.symbol()
                    )))
                }
            }
        };
    }

    macro_rules! float_arith {
        ($l:expr, $r:expr, $ctor:ident) => {
            match op {
                BinaryOp::Add => $ctor($l + $r),
                BinaryOp::Sub => $ctor($l - $r),
                BinaryOp::Mul => $ctor($l * $r),
                BinaryOp::Div => $ctor($l / $r),
                BinaryOp::Mod => $ctor($l % $r),
                BinaryOp::Lt => Bool($l < $r),
                BinaryOp::Le => Bool($l <= $r),
                BinaryOp::Gt => Bool($l > $r),
                BinaryOp::Ge => Bool($l >= $r),
                BinaryOp::Eq => Bool($l == $r),
                BinaryOp::Ne => Bool($l != $r),
                _ => {
                    return Err(Error::unsupported(format!(
                        "operator {} over floating-point operands",
                        op.symbol()
                    )))
                }
            }
        };
    }

    Ok(match promote_pair(left, right)? {
        Promoted::Int(l, r) => int_arith!(l, r, Int),
        Promoted::UInt(l, r) => int_arith!(l, r, UInt),
        Promoted::Long(l, r) => int_arith!(l, r, Long),
        Promoted::ULong(l, r) => int_arith!(l, r, ULong),
        Promoted::Float(l, r) => float_arith!(l, r, Float),
        Promoted::Double(l, r) => float_arith!(l, r, Double),
    })
}

/// Compute the literal result of a unary operation over a literal
pub fn eval_unary(op: UnaryOp, operand: &Literal) -> Result<Literal> {
    use Literal::*;

    if op.is_mutating() {
        return Err(Error::unsupported(format!(
            "mutating operator over literal {}",
            operand
        )));
    }

    match op {
        UnaryOp::Not => match operand {
            Bool(v) => Ok(Bool(!v)),
            other => Err(Error::unsupported(format!(
                "logical negation of {}",
                other
            ))),
        },
        UnaryOp::Plus | UnaryOp::Minus | UnaryOp::BitNot => {
            let negate = op == UnaryOp::Minus;
            let invert = op == UnaryOp::BitNot;
            match promote_one(operand)? {
                PromotedOne::Int(v) => Ok(if negate {
                    Int(v.wrapping_neg())
                } else if invert {
                    Int(!v)
                } else {
                    Int(v)
                }),
                // Negating uint widens to long; there is no 32-bit result
                PromotedOne::UInt(v) => Ok(if negate {
                    Long(-(v as i64))
                } else if invert {
                    UInt(!v)
                } else {
                    UInt(v)
                }),
                PromotedOne::Long(v) => Ok(if negate {
                    Long(v.wrapping_neg())
                } else if invert {
                    Long(!v)
                } else {
                    Long(v)
                }),
                PromotedOne::ULong(v) => {
                    if negate {
                        Err(Error::unsupported("negation of ulong"))
                    } else if invert {
                        Ok(ULong(!v))
                    } else {
                        Ok(ULong(v))
                    }
                }
                PromotedOne::Float(v) => {
                    if invert {
                        Err(Error::unsupported("bitwise complement of float"))
                    } else if negate {
                        Ok(Float(-v))
                    } else {
                        Ok(Float(v))
                    }
                }
                PromotedOne::Double(v) => {
                    if invert {
                        Err(Error::unsupported("bitwise complement of double"))
                    } else if negate {
                        Ok(Double(-v))
                    } else {
                        Ok(Double(v))
                    }
                }
            }
        }
        _ => Err(Error::unsupported(format!(
            "unary operator over {}",
            operand
        ))),
    }
}

/// Compute the literal result of casting a literal to a primitive kind.
/// Integer narrowing truncates to the target's low bits; integer widening
/// sign- or zero-extends by the source's signedness; float-to-integer
/// saturates at the target's bounds.
pub fn eval_cast(target: PrimitiveKind, value: &Literal) -> Result<Literal> {
    use Literal::*;

    let unsupported = || {
        Error::unsupported(format!(
            "cast of {} to {}",
            value,
            target.name()
        ))
    };

    if target == PrimitiveKind::Bool {
        return match value {
            Bool(v) => Ok(Bool(*v)),
            _ => Err(unsupported()),
        };
    }

    // Everything below is numeric; char participates as its code unit
    if let Some(v) = int_value(value) {
        return Ok(match target {
            PrimitiveKind::SByte => SByte(v as i8),
            PrimitiveKind::Byte => Byte(v as u8),
            PrimitiveKind::Short => Short(v as i16),
            PrimitiveKind::UShort => UShort(v as u16),
            PrimitiveKind::Int => Int(v as i32),
            PrimitiveKind::UInt => UInt(v as u32),
            PrimitiveKind::Long => Long(v as i64),
            PrimitiveKind::ULong => ULong(v as u64),
            PrimitiveKind::Float => Float(v as f32),
            PrimitiveKind::Double => Double(v as f64),
            PrimitiveKind::Char => {
                let unit = v as u16;
                match char::from_u32(unit as u32) {
                    Some(c) => Char(c),
                    None => return Err(unsupported()),
                }
            }
            PrimitiveKind::Bool => unreachable!(),
        });
    }
    if let Some(v) = float_value(value) {
        return Ok(match target {
            PrimitiveKind::SByte => SByte(v as i8),
            PrimitiveKind::Byte => Byte(v as u8),
            PrimitiveKind::Short => Short(v as i16),
            PrimitiveKind::UShort => UShort(v as u16),
            PrimitiveKind::Int => Int(v as i32),
            PrimitiveKind::UInt => UInt(v as u32),
            PrimitiveKind::Long => Long(v as i64),
            PrimitiveKind::ULong => ULong(v as u64),
            PrimitiveKind::Float => Float(v as f32),
            PrimitiveKind::Double => Double(v),
            PrimitiveKind::Char => {
                let unit = v as u16;
                match char::from_u32(unit as u32) {
                    Some(c) => Char(c),
                    None => return Err(unsupported()),
                }
            }
            PrimitiveKind::Bool => unreachable!(),
        });
    }

    Err(unsupported())
}
