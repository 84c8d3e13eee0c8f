use std::fmt::{self, Display};

/// Release region inferred from a ROM filename or header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Region {
    Usa,
    Eur,
    Jpn,
    World,
    Aus,
    Kor,
    Chn,
    Asia,
    Fra,
    Ger,
    Spa,
    Ita,
    Bra,
    Rus,
    Uk,
    JpnUsa,
    JpnEur,
    UsaEur,
    #[default]
    Unknown,
}

impl Region {
    /// Short code as it appears in tags and summaries (`USA`, `JPN/EUR`).
    pub const fn code(self) -> &'static str {
        match self {
            Region::Usa => "USA",
            Region::Eur => "EUR",
            Region::Jpn => "JPN",
            Region::World => "World",
            Region::Aus => "AUS",
            Region::Kor => "KOR",
            Region::Chn => "CHN",
            Region::Asia => "Asia",
            Region::Fra => "FRA",
            Region::Ger => "GER",
            Region::Spa => "SPA",
            Region::Ita => "ITA",
            Region::Bra => "BRA",
            Region::Rus => "RUS",
            Region::Uk => "UK",
            Region::JpnUsa => "JPN/USA",
            Region::JpnEur => "JPN/EUR",
            Region::UsaEur => "USA/EUR",
            Region::Unknown => "Unknown",
        }
    }

    pub const fn display_name(self) -> &'static str {
        match self {
            Region::Usa => "USA (NTSC-U)",
            Region::Eur => "Europe (PAL)",
            Region::Jpn => "Japan (NTSC-J)",
            Region::World => "World",
            Region::Aus => "Australia",
            Region::Kor => "Korea",
            Region::Chn => "China",
            Region::Asia => "Asia",
            Region::Fra => "France",
            Region::Ger => "Germany",
            Region::Spa => "Spain",
            Region::Ita => "Italy",
            Region::Bra => "Brazil",
            Region::Rus => "Russia",
            Region::Uk => "United Kingdom",
            Region::JpnUsa => "Japan/USA",
            Region::JpnEur => "Japan/Europe",
            Region::UsaEur => "USA/Europe",
            Region::Unknown => "Unknown",
        }
    }

    /// Look up a lowercase tag (`usa`, `ntsc-j`, `u`, `jue`).
    pub fn from_code(code: &str) -> Option<Self> {
        REGION_CODES
            .iter()
            .find(|(tag, _)| *tag == code)
            .map(|(_, region)| *region)
    }

    /// Combine a set of single regions the way multi-region tags read.
    ///
    /// Three or more distinct regions, or any `World`, collapse to `World`.
    /// Two regions join into one of the paired variants when one exists.
    pub fn combine(regions: &[Region]) -> Option<Self> {
        let mut distinct: Vec<Region> = regions.to_vec();
        distinct.sort_by_key(|r| r.code());
        distinct.dedup();
        match distinct.as_slice() {
            [] => None,
            [single] => Some(*single),
            many if many.len() >= 3 || many.contains(&Region::World) => {
                Some(Region::World)
            }
            [a, b] => Some(match (a, b) {
                (Region::Eur, Region::Jpn) => Region::JpnEur,
                (Region::Jpn, Region::Usa) => Region::JpnUsa,
                (Region::Eur, Region::Usa) => Region::UsaEur,
                _ => *a,
            }),
            _ => None,
        }
    }
}

impl Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

const REGION_CODES: &[(&str, Region)] = &[
    ("usa", Region::Usa),
    ("us", Region::Usa),
    ("america", Region::Usa),
    ("ntsc-u", Region::Usa),
    ("europe", Region::Eur),
    ("eu", Region::Eur),
    ("eur", Region::Eur),
    ("pal", Region::Eur),
    ("ntsc-pal", Region::Eur),
    ("japan", Region::Jpn),
    ("jp", Region::Jpn),
    ("jpn", Region::Jpn),
    ("ntsc-j", Region::Jpn),
    ("world", Region::World),
    ("wld", Region::World),
    ("worldwide", Region::World),
    ("australia", Region::Aus),
    ("aus", Region::Aus),
    ("korea", Region::Kor),
    ("kor", Region::Kor),
    ("china", Region::Chn),
    ("chn", Region::Chn),
    ("asia", Region::Asia),
    ("asi", Region::Asia),
    ("asian", Region::Asia),
    ("france", Region::Fra),
    ("fra", Region::Fra),
    ("germany", Region::Ger),
    ("ger", Region::Ger),
    ("deu", Region::Ger),
    ("spain", Region::Spa),
    ("spa", Region::Spa),
    ("esp", Region::Spa),
    ("italy", Region::Ita),
    ("ita", Region::Ita),
    ("brazil", Region::Bra),
    ("bra", Region::Bra),
    ("russia", Region::Rus),
    ("rus", Region::Rus),
    ("uk", Region::Uk),
    ("united kingdom", Region::Uk),
    ("u", Region::Usa),
    ("e", Region::Eur),
    ("j", Region::Jpn),
    ("a", Region::Asia),
    ("k", Region::Kor),
    ("f", Region::Fra),
    ("g", Region::Ger),
    ("s", Region::Spa),
    ("i", Region::Ita),
    ("jue", Region::World),
    ("uje", Region::World),
    ("euj", Region::World),
    ("ju", Region::JpnUsa),
    ("uj", Region::JpnUsa),
    ("je", Region::JpnEur),
    ("ej", Region::JpnEur),
    ("ue", Region::UsaEur),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_and_display() {
        assert_eq!(Region::from_code("ntsc-j"), Some(Region::Jpn));
        assert_eq!(Region::from_code("eu"), Some(Region::Eur));
        assert_eq!(Region::Usa.display_name(), "USA (NTSC-U)");
        assert_eq!(Region::JpnEur.to_string(), "JPN/EUR");
    }

    #[test]
    fn combine_collapses_to_world() {
        let three = [Region::Usa, Region::Eur, Region::Jpn];
        assert_eq!(Region::combine(&three), Some(Region::World));
        assert_eq!(
            Region::combine(&[Region::Usa, Region::World]),
            Some(Region::World)
        );
        assert_eq!(
            Region::combine(&[Region::Usa, Region::Eur]),
            Some(Region::UsaEur)
        );
        assert_eq!(
            Region::combine(&[Region::Usa, Region::Usa]),
            Some(Region::Usa)
        );
        assert_eq!(Region::combine(&[]), None);
    }
}
