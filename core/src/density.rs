use std::fmt::{self, Display};

/// Screen density bucket
///
/// See: <https://developer.android.com/guide/topics/resources/providing-resources#DensityQualifier>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u16)]
pub enum Density {
    Low = 120,
    Medium = 160,
    TV = 213,
    High = 240,
    XHigh = 320,
    XXHigh = 480,
    XXXHigh = 640,
}

impl Density {
    /// All buckets, ascending
    pub const ALL: [Density; 7] = [
        Density::Low,
        Density::Medium,
        Density::TV,
        Density::High,
        Density::XHigh,
        Density::XXHigh,
        Density::XXXHigh,
    ];

    #[inline]
    pub fn dpi(self) -> u16 {
        self as u16
    }

    /// Qualifier as it appears in folder names, e.g. `xhdpi`
    pub fn qualifier(self) -> &'static str {
        match self {
            Self::Low => "ldpi",
            Self::Medium => "mdpi",
            Self::TV => "tvdpi",
            Self::High => "hdpi",
            Self::XHigh => "xhdpi",
            Self::XXHigh => "xxhdpi",
            Self::XXXHigh => "xxxhdpi",
        }
    }

    pub fn from_qualifier(value: &str) -> Option<Density> {
        Self::ALL.into_iter().find(|d| d.qualifier() == value)
    }

    pub fn from_dpi(dpi: u16) -> Option<Density> {
        Self::ALL.into_iter().find(|d| d.dpi() == dpi)
    }
}

impl Display for Density {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.qualifier())
    }
}

/// One slot of a density preference list
///
/// `None` stands for unqualified resources (`theme_values.xml`, `drawable/`).
pub type DensitySlot = Option<Density>;

/// File name suffix for a slot, `-xhdpi` or nothing
pub fn density_suffix(slot: DensitySlot) -> String {
    match slot {
        Some(density) => format!("-{}", density),
        None => String::new(),
    }
}

/// Provides the order in which density buckets are tried for a device
pub trait DensityOrder: Send + Sync {
    fn density_order(&self, device_dpi: u16) -> Vec<DensitySlot>;
}

/// Closest bucket first, then larger buckets, then smaller ones, then unqualified
#[derive(Debug, Default, Clone, Copy)]
pub struct BestDensityOrder;

impl DensityOrder for BestDensityOrder {
    fn density_order(&self, device_dpi: u16) -> Vec<DensitySlot> {
        best_density_order(device_dpi)
    }
}

pub fn best_density_order(device_dpi: u16) -> Vec<DensitySlot> {
    // tvdpi assets are rare in themes, only use them on tvdpi devices
    let candidates = Density::ALL
        .into_iter()
        .filter(|d| *d != Density::TV || device_dpi == Density::TV.dpi());

    let (higher, lower): (Vec<Density>, Vec<Density>) =
        candidates.partition(|d| d.dpi() >= device_dpi);

    let mut order: Vec<DensitySlot> = Vec::with_capacity(Density::ALL.len() + 1);
    order.extend(higher.into_iter().map(Some));
    order.extend(lower.into_iter().rev().map(Some));
    order.push(None);
    order
}

/// Find the density qualifier inside a relative path
///
/// Recognizes `drawable-hdpi-v4/x.png` style qualifier folders and bare
/// `hdpi/x.png` folders. Only directory segments are inspected.
pub fn find_density(path: &str) -> Option<Density> {
    let (dirs, _) = path.rsplit_once('/')?;

    dirs.split('/')
        .flat_map(|segment| segment.split('-'))
        .find_map(Density::from_qualifier)
}

/// Replace the density qualifier of `path` with `slot`
///
/// Returns `None` if the path carries no density qualifier. Replacing with the
/// unqualified slot drops the qualifier (`drawable-hdpi` -> `drawable`), a bare
/// density folder can't be dropped and yields `None`.
pub fn substitute_density(path: &str, slot: DensitySlot) -> Option<String> {
    let (dirs, file) = path.rsplit_once('/')?;
    let mut found = false;

    let mut segments = Vec::new();
    for segment in dirs.split('/') {
        if found {
            segments.push(segment.to_owned());
            continue;
        }

        let parts: Vec<&str> = segment.split('-').collect();
        let Some(position) = parts.iter().position(|p| Density::from_qualifier(p).is_some()) else {
            segments.push(segment.to_owned());
            continue;
        };

        found = true;
        let mut replaced: Vec<&str> = parts.clone();
        match slot {
            Some(density) => replaced[position] = density.qualifier(),
            None if parts.len() > 1 => {
                replaced.remove(position);
            }
            None => return None,
        }
        segments.push(replaced.join("-"));
    }

    if !found {
        return None;
    }

    Some(format!("{}/{}", segments.join("/"), file))
}
