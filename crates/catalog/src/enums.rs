//! Closed value sets used by catalog entities.
//!
//! Each enum is declared once with its full mapping table: variant, wire value
//! (the integer stored in the database) and display label (the text used by
//! the source site, plus accepted aliases). Decoding never fails: unknown wire
//! values and unknown labels map to the enum's fallback variant.

use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use std::fmt;

/// Bidirectional mapping shared by every catalog enum
pub trait CatalogEnum: Sized + Copy + 'static {
    /// Every variant, fallback included
    const ALL: &'static [Self];
    /// Variant used for unmapped wire values and labels
    const FALLBACK: Self;

    fn wire(self) -> u8;
    fn label(self) -> &'static str;
    fn aliases(self) -> &'static [&'static str];

    fn from_wire(value: u8) -> Self {
        Self::ALL
            .iter()
            .copied()
            .find(|v| v.wire() == value)
            .unwrap_or(Self::FALLBACK)
    }

    fn from_label(text: &str) -> Self {
        let needle = normalize_label(text);
        if needle.is_empty() {
            return Self::FALLBACK;
        }
        Self::ALL
            .iter()
            .copied()
            .find(|v| {
                normalize_label(v.label()) == needle
                    || v.aliases().iter().any(|a| normalize_label(a) == needle)
            })
            .unwrap_or(Self::FALLBACK)
    }
}

/// Lowercase, strip French accents and collapse separators
fn normalize_label(text: &str) -> String {
    let folded: String = text
        .trim()
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'à' | 'â' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'î' | 'ï' => 'i',
            'ô' | 'ö' => 'o',
            'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            '-' | '_' => ' ',
            other => other,
        })
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

macro_rules! catalog_enum {
    (
        $(#[$meta:meta])*
        $name:ident, fallback = $fallback:ident {
            $( $variant:ident => ($wire:literal, $label:literal $(, [$($alias:literal),* $(,)?])? ) ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl CatalogEnum for $name {
            const ALL: &'static [Self] = &[$($name::$variant),+];
            const FALLBACK: Self = $name::$fallback;

            fn wire(self) -> u8 {
                match self {
                    $($name::$variant => $wire),+
                }
            }

            fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }

            fn aliases(self) -> &'static [&'static str] {
                match self {
                    $($name::$variant => &[$($($alias),*)?]),+
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$fallback
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(i64::from(self.wire())))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                let raw = value.as_i64()?;
                Ok(u8::try_from(raw)
                    .map(<$name as CatalogEnum>::from_wire)
                    .unwrap_or(<$name as CatalogEnum>::FALLBACK))
            }
        }
    };
}

catalog_enum! {
    /// Content vertical of the source site
    Section, fallback = Unknown {
        Unknown => (0, "Inconnu"),
        Anime => (1, "Anime", ["animes", "animation"]),
        Manga => (2, "Manga", ["mangas"]),
        Drama => (3, "Drama", ["dramas"]),
        LightNovel => (4, "Light Novel", ["light novels", "novel", "ln"]),
        Community => (5, "Communauté", ["community", "communaute"]),
    }
}

impl Section {
    /// Host label of the section on the source site
    pub fn slug(self) -> &'static str {
        match self {
            Section::Anime => "anime",
            Section::Manga => "manga",
            Section::Drama => "drama",
            Section::LightNovel => "novel",
            Section::Community | Section::Unknown => "communaute",
        }
    }
}

catalog_enum! {
    /// Kind of a category
    CategoryType, fallback = Unknown {
        Unknown => (0, "Inconnu"),
        Genre => (1, "Genre", ["genres"]),
        Theme => (2, "Thème", ["themes", "theme"]),
    }
}

catalog_enum! {
    /// Broadcast or publication state of a sheet
    DiffusionState, fallback = Unknown {
        Unknown => (0, "Inconnu"),
        Ongoing => (1, "En cours", ["en cours de diffusion", "en cours de publication"]),
        Completed => (2, "Terminé", ["termine", "fini"]),
        Upcoming => (3, "À paraître", ["a venir", "prochainement"]),
        Stopped => (4, "Arrêté", ["abandonne", "en pause"]),
    }
}

catalog_enum! {
    /// Kind of a contact sheet
    ContactType, fallback = Unknown {
        Unknown => (0, "Inconnu"),
        Person => (1, "Personne", ["person", "auteur", "artiste"]),
        Studio => (2, "Studio", ["studios", "studio d'animation"]),
        Distributor => (3, "Distributeur", ["editeur", "diffuseur"]),
    }
}

catalog_enum! {
    /// Role of a contact on a sheet
    ContactRole, fallback = Unknown {
        Unknown => (0, "Inconnu"),
        Studio => (1, "Studio", ["studio d'animation", "animation"]),
        Author => (2, "Auteur", ["auteur original", "scenario", "scénariste"]),
        Director => (3, "Réalisateur", ["realisation", "réalisation"]),
        Composer => (4, "Compositeur", ["musique"]),
        Distributor => (5, "Distributeur", ["editeur", "éditeur", "diffuseur"]),
    }
}

catalog_enum! {
    /// Personal watch state of a sheet
    WatchStatus, fallback = NotPlanned {
        NotPlanned => (0, "Non prévu"),
        Planned => (1, "Prévu", ["a voir", "à voir"]),
        Watching => (2, "En cours", ["watching"]),
        Completed => (3, "Terminé", ["vu", "completed"]),
        Paused => (4, "En pause", ["paused"]),
        Dropped => (5, "Abandonné", ["dropped"]),
    }
}

catalog_enum! {
    /// Ordering direction of listing queries
    SortOrder, fallback = Unknown {
        Unknown => (0, "Inconnu"),
        Ascending => (1, "asc", ["ascending", "croissant"]),
        Descending => (2, "desc", ["descending", "decroissant"]),
    }
}

impl SortOrder {
    /// SQL keyword; unknown ordering sorts ascending
    pub fn sql(self) -> &'static str {
        match self {
            SortOrder::Descending => "DESC",
            SortOrder::Ascending | SortOrder::Unknown => "ASC",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_table_is_consistent<E: CatalogEnum + PartialEq + fmt::Debug>() {
        for &variant in E::ALL {
            assert_eq!(E::from_wire(variant.wire()), variant);
            assert_eq!(E::from_label(variant.label()), variant);
        }
    }

    #[test]
    fn test_tables_round_trip() {
        assert_table_is_consistent::<Section>();
        assert_table_is_consistent::<CategoryType>();
        assert_table_is_consistent::<DiffusionState>();
        assert_table_is_consistent::<ContactType>();
        assert_table_is_consistent::<ContactRole>();
        assert_table_is_consistent::<WatchStatus>();
        assert_table_is_consistent::<SortOrder>();
    }

    #[test]
    fn test_unmapped_values_use_fallback() {
        assert_eq!(Section::from_label("Jeux vidéo"), Section::Unknown);
        assert_eq!(Section::from_wire(42), Section::Unknown);
        assert_eq!(CategoryType::from_label(""), CategoryType::Unknown);
        assert_eq!(DiffusionState::from_label("???"), DiffusionState::Unknown);
        assert_eq!(WatchStatus::from_label("whatever"), WatchStatus::NotPlanned);
        assert_eq!(WatchStatus::from_wire(255), WatchStatus::NotPlanned);
        assert_eq!(SortOrder::from_label("sideways"), SortOrder::Unknown);
        assert_eq!(ContactRole::from_label("Doubleur"), ContactRole::Unknown);
    }

    #[test]
    fn test_labels_are_accent_and_case_insensitive() {
        assert_eq!(DiffusionState::from_label("  TERMINE "), DiffusionState::Completed);
        assert_eq!(DiffusionState::from_label("à paraître"), DiffusionState::Upcoming);
        assert_eq!(Section::from_label("light-novel"), Section::LightNovel);
        assert_eq!(CategoryType::from_label("Thèmes"), CategoryType::Theme);
    }

    #[test]
    fn test_sort_order_sql() {
        assert_eq!(SortOrder::Descending.sql(), "DESC");
        assert_eq!(SortOrder::Unknown.sql(), "ASC");
    }
}
