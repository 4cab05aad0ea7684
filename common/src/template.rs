//! printf-style display format templates.
//!
//! Each reading box is described by a format such as `"%d V"` or `"%.1f kW"`.
//! [`Template::parse`] validates the format once when the slot is created, so
//! rendering on every display tick cannot fail on a bad format.
//!
//! Supported directives:
//!
//! - `%%` literal percent sign
//! - `%d` `%i` `%u` `%x` `%X` integer conversions
//! - `%f` `%F` `%e` `%E` `%g` `%G` floating point conversions
//! - flags `-` `+` space `0` `#`, field width and precision
//! - C length modifiers (`l`, `h`, `z`, ...) are accepted and ignored
//!
//! A template holds at most one value conversion. Integer conversions given a
//! floating point value truncate it, floating point conversions given an
//! integer widen it, matching a cast at the call site.
//!
//! # Exact sizing
//!
//! [`Template::render_len`] runs the formatter against a counting writer,
//! so [`Template::render`] can allocate the output exactly once at its final
//! size. There is no fixed-size buffer and no truncation.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::{self, Write};

/// Widest field width or precision accepted in a template.
pub const MAX_FIELD: u16 = 128;

// =============================================================================
// Values and Errors
// =============================================================================

/// A value handed to a template.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Number {
    Integer(i32),
    Float(f32),
}

impl Number {
    /// Value as seen by an integer conversion (floats truncate, saturating).
    #[inline]
    fn as_i64(self) -> i64 {
        match self {
            Self::Integer(v) => i64::from(v),
            Self::Float(v) => v as i64,
        }
    }

    /// Value as seen by a floating point conversion.
    #[inline]
    fn as_f64(self) -> f64 {
        match self {
            Self::Integer(v) => f64::from(v),
            Self::Float(v) => f64::from(v),
        }
    }
}

impl From<i32> for Number {
    fn from(v: i32) -> Self { Self::Integer(v) }
}

impl From<f32> for Number {
    fn from(v: f32) -> Self { Self::Float(v) }
}

/// Why a format string was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TemplateError {
    /// The format ends in the middle of a `%` directive.
    DanglingPercent,
    /// The directive ends in a character that is not a supported conversion.
    UnknownConversion(char),
    /// More than one value conversion; a slot only carries one value.
    MultipleConversions,
    /// Width or precision exceeds [`MAX_FIELD`].
    FieldTooWide,
}

impl fmt::Display for TemplateError {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Self::DanglingPercent => f.write_str("format ends inside a % directive"),
            Self::UnknownConversion(c) => write!(f, "unsupported conversion '%{c}'"),
            Self::MultipleConversions => f.write_str("format has more than one value conversion"),
            Self::FieldTooWide => write!(f, "width or precision larger than {MAX_FIELD}"),
        }
    }
}

impl core::error::Error for TemplateError {}

// =============================================================================
// Parsed Representation
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Conversion {
    Signed,
    Unsigned,
    Hex { upper: bool },
    Fixed { upper: bool },
    Exponent { upper: bool },
    General { upper: bool },
}

impl Conversion {
    const fn from_char(c: char) -> Option<Self> {
        Some(match c {
            'd' | 'i' => Self::Signed,
            'u' => Self::Unsigned,
            'x' => Self::Hex { upper: false },
            'X' => Self::Hex { upper: true },
            'f' => Self::Fixed { upper: false },
            'F' => Self::Fixed { upper: true },
            'e' => Self::Exponent { upper: false },
            'E' => Self::Exponent { upper: true },
            'g' => Self::General { upper: false },
            'G' => Self::General { upper: true },
            _ => return None,
        })
    }

    const fn is_integer(self) -> bool { matches!(self, Self::Signed | Self::Unsigned | Self::Hex { .. }) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct Flags {
    left: bool,
    plus: bool,
    space: bool,
    zero: bool,
    alt: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Directive {
    flags: Flags,
    width: u16,
    precision: Option<u16>,
    conversion: Conversion,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Text(&'static str),
    Value(Directive),
}

/// A validated display format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: &'static str,
    pieces: Vec<Piece>,
}

// =============================================================================
// Parsing
// =============================================================================

impl Template {
    /// Parse and validate a format string.
    pub fn parse(source: &'static str) -> Result<Self, TemplateError> {
        let bytes = source.as_bytes();
        let mut pieces = Vec::new();
        let mut has_value = false;
        let mut text_start = 0;
        let mut i = 0;

        while i < bytes.len() {
            if bytes[i] != b'%' {
                i += 1;
                continue;
            }
            if text_start < i {
                pieces.push(Piece::Text(&source[text_start..i]));
            }
            i += 1;

            if bytes.get(i) == Some(&b'%') {
                pieces.push(Piece::Text(&source[i..=i]));
                i += 1;
                text_start = i;
                continue;
            }

            let (directive, next) = parse_directive(source, i)?;
            if has_value {
                return Err(TemplateError::MultipleConversions);
            }
            has_value = true;
            pieces.push(Piece::Value(directive));
            i = next;
            text_start = i;
        }

        if text_start < bytes.len() {
            pieces.push(Piece::Text(&source[text_start..]));
        }

        Ok(Self { source, pieces })
    }

    /// The format string this template was parsed from.
    #[inline]
    pub const fn source(&self) -> &'static str { self.source }

    /// Whether the template contains a value conversion at all.
    pub fn has_value(&self) -> bool { self.pieces.iter().any(|p| matches!(p, Piece::Value(_))) }
}

/// Parse one directive starting just after its `%`.
/// Returns the directive and the index after its conversion character.
fn parse_directive(
    source: &str,
    mut i: usize,
) -> Result<(Directive, usize), TemplateError> {
    let bytes = source.as_bytes();
    let mut flags = Flags::default();

    while let Some(&b) = bytes.get(i) {
        match b {
            b'-' => flags.left = true,
            b'+' => flags.plus = true,
            b' ' => flags.space = true,
            b'0' => flags.zero = true,
            b'#' => flags.alt = true,
            _ => break,
        }
        i += 1;
    }

    let (width, next) = parse_number(bytes, i)?;
    i = next;

    let mut precision = None;
    if bytes.get(i) == Some(&b'.') {
        let (value, next) = parse_number(bytes, i + 1)?;
        precision = Some(value);
        i = next;
    }

    while matches!(bytes.get(i), Some(b'h' | b'l' | b'L' | b'q' | b'j' | b'z' | b't')) {
        i += 1;
    }

    // Conversion characters are ASCII; anything else is reported as the full char.
    let c = source[i..].chars().next().ok_or(TemplateError::DanglingPercent)?;
    let conversion = Conversion::from_char(c).ok_or(TemplateError::UnknownConversion(c))?;

    Ok((
        Directive {
            flags,
            width,
            precision,
            conversion,
        },
        i + c.len_utf8(),
    ))
}

fn parse_number(
    bytes: &[u8],
    mut i: usize,
) -> Result<(u16, usize), TemplateError> {
    let mut value: u16 = 0;
    while let Some(&b) = bytes.get(i) {
        if !b.is_ascii_digit() {
            break;
        }
        value = value * 10 + u16::from(b - b'0');
        if value > MAX_FIELD {
            return Err(TemplateError::FieldTooWide);
        }
        i += 1;
    }
    Ok((value, i))
}

// =============================================================================
// Rendering
// =============================================================================

impl Template {
    /// Write the formatted text for `value` into `out`.
    pub fn render_into<W: Write>(
        &self,
        out: &mut W,
        value: Number,
    ) -> fmt::Result {
        for piece in &self.pieces {
            match piece {
                Piece::Text(text) => out.write_str(text)?,
                Piece::Value(directive) => directive.write(out, value)?,
            }
        }
        Ok(())
    }

    /// Exact length in bytes of the formatted text for `value`.
    pub fn render_len(
        &self,
        value: Number,
    ) -> usize {
        let mut counter = Counter(0);
        // Counter never fails
        let _ = self.render_into(&mut counter, value);
        counter.0
    }

    /// Formatted text for `value`, allocated at exactly its final length.
    pub fn render(
        &self,
        value: Number,
    ) -> String {
        let mut text = String::with_capacity(self.render_len(value));
        let _ = self.render_into(&mut text, value);
        text
    }
}

impl Directive {
    fn write<W: Write>(
        &self,
        out: &mut W,
        value: Number,
    ) -> fmt::Result {
        if self.conversion.is_integer() {
            self.write_integer(out, value.as_i64())
        } else {
            self.write_float(out, value.as_f64())
        }
    }

    fn write_integer<W: Write>(
        &self,
        out: &mut W,
        value: i64,
    ) -> fmt::Result {
        let (negative, magnitude) = match self.conversion {
            Conversion::Signed => (value < 0, value.unsigned_abs()),
            _ => (false, u64::from(value as u32)),
        };
        let prefix = match self.conversion {
            Conversion::Hex { upper } if self.flags.alt && magnitude != 0 => {
                if upper {
                    "0X"
                } else {
                    "0x"
                }
            }
            _ => "",
        };
        let signed = self.conversion == Conversion::Signed;
        // An explicit precision disables zero padding
        let zero_ok = self.precision.is_none();

        self.emit(out, self.sign(negative, signed), prefix, zero_ok, &|w| self.integer_body(w, magnitude))
    }

    fn integer_body(
        &self,
        w: &mut dyn Write,
        magnitude: u64,
    ) -> fmt::Result {
        if self.precision == Some(0) && magnitude == 0 {
            return Ok(());
        }
        let mut digits = Counter(0);
        self.integer_digits(&mut digits, magnitude)?;
        let min = usize::from(self.precision.unwrap_or(1));
        write_repeat(w, '0', min.saturating_sub(digits.0))?;
        self.integer_digits(w, magnitude)
    }

    fn integer_digits(
        &self,
        w: &mut dyn Write,
        magnitude: u64,
    ) -> fmt::Result {
        match self.conversion {
            Conversion::Hex { upper: true } => write!(w, "{magnitude:X}"),
            Conversion::Hex { upper: false } => write!(w, "{magnitude:x}"),
            _ => write!(w, "{magnitude}"),
        }
    }

    fn write_float<W: Write>(
        &self,
        out: &mut W,
        value: f64,
    ) -> fmt::Result {
        let sign = self.sign(value.is_sign_negative(), true);
        let abs = value.abs();
        if !abs.is_finite() {
            let upper = matches!(
                self.conversion,
                Conversion::Fixed { upper: true } | Conversion::Exponent { upper: true } | Conversion::General { upper: true }
            );
            let text = match (abs.is_nan(), upper) {
                (true, false) => "nan",
                (true, true) => "NAN",
                (false, false) => "inf",
                (false, true) => "INF",
            };
            return self.emit(out, sign, "", false, &|w| w.write_str(text));
        }
        self.emit(out, sign, "", true, &|w| self.float_body(w, abs))
    }

    fn float_body(
        &self,
        w: &mut dyn Write,
        abs: f64,
    ) -> fmt::Result {
        let precision = usize::from(self.precision.unwrap_or(6));
        let alt = self.flags.alt;
        match self.conversion {
            Conversion::Exponent { upper } => write_exponent(w, abs, precision, upper, alt),
            Conversion::General { upper } => {
                if alt {
                    write_general(w, abs, precision, upper, alt)
                } else {
                    write_general(&mut TrimZeros::new(w), abs, precision, upper, alt)
                }
            }
            _ => write_fixed(w, abs, precision, alt),
        }
    }

    const fn sign(
        &self,
        negative: bool,
        signed: bool,
    ) -> &'static str {
        if negative {
            "-"
        } else if signed && self.flags.plus {
            "+"
        } else if signed && self.flags.space {
            " "
        } else {
            ""
        }
    }

    /// Write sign, prefix and body padded to the field width.
    fn emit<W: Write>(
        &self,
        out: &mut W,
        sign: &str,
        prefix: &str,
        zero_ok: bool,
        body: &dyn Fn(&mut dyn Write) -> fmt::Result,
    ) -> fmt::Result {
        let mut counter = Counter(0);
        body(&mut counter)?;
        let len = sign.len() + prefix.len() + counter.0;
        let fill = usize::from(self.width).saturating_sub(len);

        if self.flags.left {
            out.write_str(sign)?;
            out.write_str(prefix)?;
            body(out)?;
            write_repeat(out, ' ', fill)
        } else if self.flags.zero && zero_ok {
            out.write_str(sign)?;
            out.write_str(prefix)?;
            write_repeat(out, '0', fill)?;
            body(out)
        } else {
            write_repeat(out, ' ', fill)?;
            out.write_str(sign)?;
            out.write_str(prefix)?;
            body(out)
        }
    }
}

/// `%g`: fixed notation when the exponent is in `-4..precision`, otherwise
/// scientific, both with `precision` significant digits.
fn write_general(
    w: &mut dyn Write,
    abs: f64,
    precision: usize,
    upper: bool,
    alt: bool,
) -> fmt::Result {
    let significant = precision.max(1);
    let exponent = decimal_exponent(abs, significant - 1);
    if exponent >= -4 && exponent < significant as i32 {
        let decimals = (significant as i32 - 1 - exponent) as usize;
        write_fixed(w, abs, decimals, alt)
    } else {
        write_exponent(w, abs, significant - 1, upper, alt)
    }
}

fn write_fixed(
    w: &mut dyn Write,
    abs: f64,
    precision: usize,
    alt: bool,
) -> fmt::Result {
    write!(w, "{abs:.precision$}")?;
    if alt && precision == 0 {
        w.write_char('.')?;
    }
    Ok(())
}

fn write_exponent(
    w: &mut dyn Write,
    abs: f64,
    precision: usize,
    upper: bool,
    alt: bool,
) -> fmt::Result {
    let mut exp = CExponent::new(w, upper, alt && precision == 0);
    write!(exp, "{abs:.precision$e}")?;
    exp.finish()
}

/// Decimal exponent of `abs` once rounded to `precision` fraction digits in
/// scientific notation.
fn decimal_exponent(
    abs: f64,
    precision: usize,
) -> i32 {
    let mut probe = ExponentProbe::default();
    if write!(probe, "{abs:.precision$e}").is_err() {
        return 0;
    }
    probe.digits.parse().unwrap_or(0)
}

fn write_repeat(
    w: &mut dyn Write,
    c: char,
    count: usize,
) -> fmt::Result {
    for _ in 0..count {
        w.write_char(c)?;
    }
    Ok(())
}

// =============================================================================
// Writer Adapters
// =============================================================================

/// Counts bytes instead of storing them.
struct Counter(usize);

impl Write for Counter {
    fn write_str(
        &mut self,
        s: &str,
    ) -> fmt::Result {
        self.0 += s.len();
        Ok(())
    }
}

/// Rewrites Rust's `1.5e2` exponent notation into C's `1.5e+02`.
struct CExponent<'a> {
    inner: &'a mut dyn Write,
    upper: bool,
    force_point: bool,
    seen_point: bool,
    seen_e: bool,
    digits: heapless::String<8>,
}

impl<'a> CExponent<'a> {
    fn new(
        inner: &'a mut dyn Write,
        upper: bool,
        force_point: bool,
    ) -> Self {
        Self {
            inner,
            upper,
            force_point,
            seen_point: false,
            seen_e: false,
            digits: heapless::String::new(),
        }
    }

    fn finish(self) -> fmt::Result {
        let exponent: i32 = self.digits.parse().map_err(|_| fmt::Error)?;
        let sign = if exponent < 0 { '-' } else { '+' };
        let e = if self.upper { 'E' } else { 'e' };
        write!(self.inner, "{e}{sign}{:02}", exponent.unsigned_abs())
    }
}

impl Write for CExponent<'_> {
    fn write_str(
        &mut self,
        s: &str,
    ) -> fmt::Result {
        for c in s.chars() {
            if self.seen_e {
                self.digits.push(c).map_err(|_| fmt::Error)?;
            } else if c == 'e' {
                self.seen_e = true;
                if self.force_point && !self.seen_point {
                    self.inner.write_char('.')?;
                }
            } else {
                self.seen_point |= c == '.';
                self.inner.write_char(c)?;
            }
        }
        Ok(())
    }
}

/// Captures only the exponent digits of Rust's `{:e}` output.
#[derive(Default)]
struct ExponentProbe {
    seen_e: bool,
    digits: heapless::String<8>,
}

impl Write for ExponentProbe {
    fn write_str(
        &mut self,
        s: &str,
    ) -> fmt::Result {
        for c in s.chars() {
            if self.seen_e {
                self.digits.push(c).map_err(|_| fmt::Error)?;
            } else {
                self.seen_e = c == 'e';
            }
        }
        Ok(())
    }
}

/// Drops trailing fraction zeros (and a bare trailing point) for `%g`.
///
/// Zeros after the point are held back until a non-zero digit proves they
/// are significant. Anything that is not a digit (the exponent marker) or
/// the end of output discards them.
struct TrimZeros<'a> {
    inner: &'a mut dyn Write,
    in_fraction: bool,
    pending_point: bool,
    pending_zeros: usize,
}

impl<'a> TrimZeros<'a> {
    fn new(inner: &'a mut dyn Write) -> Self {
        Self {
            inner,
            in_fraction: false,
            pending_point: false,
            pending_zeros: 0,
        }
    }
}

impl Write for TrimZeros<'_> {
    fn write_str(
        &mut self,
        s: &str,
    ) -> fmt::Result {
        for c in s.chars() {
            match c {
                '.' => {
                    self.in_fraction = true;
                    self.pending_point = true;
                }
                '0' if self.in_fraction => self.pending_zeros += 1,
                '1'..='9' if self.in_fraction => {
                    if self.pending_point {
                        self.inner.write_char('.')?;
                        self.pending_point = false;
                    }
                    write_repeat(self.inner, '0', self.pending_zeros)?;
                    self.pending_zeros = 0;
                    self.inner.write_char(c)?;
                }
                _ => {
                    self.in_fraction = false;
                    self.pending_point = false;
                    self.pending_zeros = 0;
                    self.inner.write_char(c)?;
                }
            }
        }
        Ok(())
    }
}
