//! Widget layout arguments.

use super::WidgetError;

/// How a widget's `x`/`y` are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PositionMode {
    /// Cell coordinates from the top-left of the surface.
    #[default]
    Absolute,
    /// Cell offset from the cursor at creation, following the text as it
    /// scrolls.
    Relative,
}

/// Cell-based placement parsed from a widget's argument string.
///
/// Recognized flags: `-x N`, `-y N`, `-w N`, `-h N`, `--relative`,
/// `--absolute`. Anything else is kept in `extra` for the plugin.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WidgetParams {
    pub x: i32,
    pub y: i32,
    /// Width in cells; `None` lets the widget pick.
    pub width: Option<u32>,
    /// Height in cells; `None` lets the widget pick.
    pub height: Option<u32>,
    pub position: PositionMode,
    pub extra: Vec<String>,
}

impl WidgetParams {
    pub fn parse(args: &str) -> Result<Self, WidgetError> {
        let mut params = Self::default();
        let mut tokens = args.split_whitespace();
        while let Some(token) = tokens.next() {
            match token {
                "-x" => params.x = value(token, tokens.next())?,
                "-y" => params.y = value(token, tokens.next())?,
                "-w" => params.width = Some(extent(token, tokens.next())?),
                "-h" => params.height = Some(extent(token, tokens.next())?),
                "--relative" => params.position = PositionMode::Relative,
                "--absolute" => params.position = PositionMode::Absolute,
                other => params.extra.push(other.to_owned()),
            }
        }
        Ok(params)
    }

    /// Value of `--name=value` or `--name value` among the extra args.
    pub fn extra_value(&self, name: &str) -> Option<&str> {
        let mut iter = self.extra.iter();
        while let Some(arg) = iter.next() {
            if let Some(rest) = arg.strip_prefix(name) {
                if let Some(v) = rest.strip_prefix('=') {
                    return Some(v);
                }
                if rest.is_empty() {
                    return iter.next().map(String::as_str);
                }
            }
        }
        None
    }
}

fn value(flag: &str, raw: Option<&str>) -> Result<i32, WidgetError> {
    let raw = raw.ok_or_else(|| invalid(flag, "missing value"))?;
    raw.parse()
        .map_err(|_| invalid(flag, &format!("`{raw}` is not an integer")))
}

fn extent(flag: &str, raw: Option<&str>) -> Result<u32, WidgetError> {
    let n = value(flag, raw)?;
    match u32::try_from(n) {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(invalid(flag, "must be a positive cell count")),
    }
}

fn invalid(arg: &str, reason: &str) -> WidgetError {
    WidgetError::InvalidArgument {
        arg: arg.to_owned(),
        reason: reason.to_owned(),
    }
}
