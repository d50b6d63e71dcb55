//! Road classification, paving material, and the era tables that drive
//! both during procedural layout.

use std::str::FromStr;

/// Functional classification of a road segment, ordered from highest to
/// lowest throughput. Encoded as a single byte on the wire (`§6`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RoadClass {
    Highway = 0,
    Avenue = 1,
    Street = 2,
    Local = 3,
}

impl RoadClass {
    /// Nominal right-of-way width in meters, before era adjustment.
    pub fn base_width(self) -> f64 {
        match self {
            RoadClass::Highway => 24.0,
            RoadClass::Avenue => 16.0,
            RoadClass::Street => 12.0,
            RoadClass::Local => 8.0,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(RoadClass::Highway),
            1 => Some(RoadClass::Avenue),
            2 => Some(RoadClass::Street),
            3 => Some(RoadClass::Local),
            _ => None,
        }
    }

    /// The next class down, used when distance-based degradation steps a
    /// radial ray's classification down as it gets farther from center.
    pub fn degrade(self) -> Self {
        match self {
            RoadClass::Highway => RoadClass::Avenue,
            RoadClass::Avenue => RoadClass::Street,
            RoadClass::Street | RoadClass::Local => RoadClass::Local,
        }
    }
}

/// Paving material, chosen by era and class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RoadMaterial {
    Dirt = 0,
    Cobblestone = 1,
    Asphalt = 2,
    Concrete = 3,
}

impl RoadMaterial {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(RoadMaterial::Dirt),
            1 => Some(RoadMaterial::Cobblestone),
            2 => Some(RoadMaterial::Asphalt),
            3 => Some(RoadMaterial::Concrete),
            _ => None,
        }
    }
}

/// Historical period tag supplied on every generation request. Shapes both
/// road evolution and building massing defaults. Variants are named by the
/// threshold year that ends each bracket in the era->material rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Era {
    Through1900 = 0,
    Through1930 = 1,
    Through1950 = 2,
    Through1990 = 3,
    Beyond1990 = 4,
}

impl Era {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Era::Through1900),
            1 => Some(Era::Through1930),
            2 => Some(Era::Through1950),
            3 => Some(Era::Through1990),
            4 => Some(Era::Beyond1990),
            _ => None,
        }
    }

    /// Paving material this era defaults to for a given road class.
    pub fn material_for(self, class: RoadClass) -> RoadMaterial {
        use Era::*;
        use RoadClass::*;
        match self {
            Through1900 => RoadMaterial::Dirt,
            Through1930 => match class {
                Highway | Avenue => RoadMaterial::Cobblestone,
                _ => RoadMaterial::Dirt,
            },
            Through1950 => match class {
                Local => RoadMaterial::Dirt,
                _ => RoadMaterial::Cobblestone,
            },
            Through1990 => match class {
                Local => RoadMaterial::Cobblestone,
                _ => RoadMaterial::Asphalt,
            },
            Beyond1990 => match class {
                Highway => RoadMaterial::Concrete,
                _ => RoadMaterial::Asphalt,
            },
        }
    }

    /// Multiplier applied to [`RoadClass::base_width`] for this era: widths
    /// scale down pre-1920 and up post-1960, per the evolution rule.
    pub fn width_factor(self) -> f64 {
        match self {
            Era::Through1900 => 0.8,
            Era::Through1930 => 0.8,
            Era::Through1950 => 1.0,
            Era::Through1990 => 1.1,
            Era::Beyond1990 => 1.1,
        }
    }

    /// Probability a local street should be upgraded to an avenue, per the
    /// "20% of streets upgrade to avenues post-1950" evolution rule.
    pub fn street_upgrade_chance(self) -> f64 {
        if matches!(self, Era::Through1990 | Era::Beyond1990) {
            0.2
        } else {
            0.0
        }
    }

    pub fn favors_ring_road(self) -> bool {
        matches!(self, Era::Through1950 | Era::Through1990 | Era::Beyond1990)
    }
}

impl FromStr for Era {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        let year: Option<i32> = match normalized.as_str() {
            "1700s" | "1800s" | "1890s" => Some(1890),
            "1900s" | "1910s" => Some(1910),
            "1920s" => Some(1920),
            "1930s" => Some(1930),
            "1940s" => Some(1940),
            "1950s" => Some(1950),
            "1960s" => Some(1960),
            "1970s" => Some(1970),
            "1980s" => Some(1980),
            "1990s" => Some(1990),
            "2000s" => Some(2000),
            "2010s" => Some(2010),
            "2020s" => Some(2020),
            "2030s" => Some(2030),
            _ => normalized.parse::<i32>().ok(),
        };
        let year = year.ok_or_else(|| format!("unrecognized era tag: {normalized}"))?;
        Ok(Era::from_year(year))
    }
}

impl Era {
    /// Bucket an arbitrary year into one of the five era brackets.
    pub fn from_year(year: i32) -> Self {
        if year <= 1900 {
            Era::Through1900
        } else if year <= 1930 {
            Era::Through1930
        } else if year <= 1950 {
            Era::Through1950
        } else if year <= 1990 {
            Era::Through1990
        } else {
            Era::Beyond1990
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn era_parses_decade_tags() {
        assert_eq!(Era::from_str("1950s").unwrap(), Era::Through1950);
        assert_eq!(Era::from_str("2020s").unwrap(), Era::Beyond1990);
        assert!(Era::from_str("stone age").is_err());
    }

    #[test]
    fn road_class_round_trips_through_code() {
        for class in [RoadClass::Highway, RoadClass::Avenue, RoadClass::Street, RoadClass::Local] {
            assert_eq!(RoadClass::from_code(class.code()), Some(class));
        }
    }

    #[test]
    fn through_1950_prefers_cobblestone_avenues() {
        assert_eq!(
            Era::Through1950.material_for(RoadClass::Avenue),
            RoadMaterial::Cobblestone
        );
        assert_eq!(Era::Through1950.material_for(RoadClass::Local), RoadMaterial::Dirt);
    }

    #[test]
    fn beyond_1990_uses_concrete_highways() {
        assert_eq!(
            Era::Beyond1990.material_for(RoadClass::Highway),
            RoadMaterial::Concrete
        );
    }
}
