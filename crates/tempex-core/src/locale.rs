use std::sync::LazyLock;

use regex::Regex;

/// A language supported by the extraction grammars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Locale {
    Fr,
    En,
}

impl Locale {
    pub fn from_code(code: &str) -> Option<Self> {
        match code.to_ascii_lowercase().as_str() {
            "fr" | "fr_fr" => Some(Locale::Fr),
            "en" | "en_us" | "en_gb" => Some(Locale::En),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Locale::Fr => "fr",
            Locale::En => "en",
        }
    }

    pub fn all() -> [Locale; 2] {
        [Locale::Fr, Locale::En]
    }

    pub fn calendar(self) -> &'static Calendar {
        match self {
            Locale::Fr => &FR_CALENDAR,
            Locale::En => &EN_CALENDAR,
        }
    }
}

/// Month and weekday spellings of one locale. Weekday indexes are
/// 0 (Monday) through 6 (Sunday), month numbers 1 through 12.
pub struct Calendar {
    pub months: &'static [(&'static str, u32)],
    pub short_months: &'static [(&'static str, u32)],
    pub weekdays: &'static [(&'static str, u8)],
    pub short_weekdays: &'static [(&'static str, u8)],
    /// Canonical names used when rendering, indexed by month - 1.
    pub month_names: [&'static str; 12],
    /// Canonical names used when rendering, indexed by weekday.
    pub weekday_names: [&'static str; 7],
}

impl Calendar {
    pub fn month_number(&self, word: &str) -> Option<u32> {
        let word = word.to_lowercase();
        lookup(self.months, &word).or_else(|| lookup(self.short_months, &word))
    }

    /// Weekday lookup, tolerating the plural form of full names.
    pub fn weekday_number(&self, word: &str) -> Option<u8> {
        let word = word.to_lowercase();
        if let Some(idx) = lookup(self.weekdays, &word) {
            return Some(idx);
        }
        if let Some(stripped) = word.strip_suffix('s') {
            if let Some(idx) = lookup(self.weekdays, stripped) {
                return Some(idx);
            }
        }
        lookup(self.short_weekdays, &word)
    }
}

fn lookup<T: Copy>(table: &[(&str, T)], word: &str) -> Option<T> {
    table.iter().find(|(name, _)| *name == word).map(|(_, v)| *v)
}

static FR_CALENDAR: Calendar = Calendar {
    months: &[
        ("janvier", 1),
        ("février", 2),
        ("fevrier", 2),
        ("mars", 3),
        ("avril", 4),
        ("mai", 5),
        ("juin", 6),
        ("juillet", 7),
        ("août", 8),
        ("aout", 8),
        ("septembre", 9),
        ("octobre", 10),
        ("novembre", 11),
        ("décembre", 12),
        ("decembre", 12),
    ],
    short_months: &[
        ("jan", 1),
        ("janv", 1),
        ("fév", 2),
        ("févr", 2),
        ("fev", 2),
        ("fevr", 2),
        ("mar", 3),
        ("avr", 4),
        ("juil", 7),
        ("juill", 7),
        ("sep", 9),
        ("sept", 9),
        ("oct", 10),
        ("nov", 11),
        ("dec", 12),
        ("déc", 12),
    ],
    weekdays: &[
        ("lundi", 0),
        ("mardi", 1),
        ("mercredi", 2),
        ("jeudi", 3),
        ("vendredi", 4),
        ("samedi", 5),
        ("dimanche", 6),
    ],
    short_weekdays: &[
        ("lun", 0),
        ("mar", 1),
        ("mer", 2),
        ("merc", 2),
        ("mercr", 2),
        ("jeu", 3),
        ("ven", 4),
        ("sam", 5),
        ("dim", 6),
    ],
    month_names: [
        "janvier",
        "février",
        "mars",
        "avril",
        "mai",
        "juin",
        "juillet",
        "août",
        "septembre",
        "octobre",
        "novembre",
        "décembre",
    ],
    weekday_names: [
        "lundi", "mardi", "mercredi", "jeudi", "vendredi", "samedi", "dimanche",
    ],
};

static EN_CALENDAR: Calendar = Calendar {
    months: &[
        ("january", 1),
        ("february", 2),
        ("march", 3),
        ("april", 4),
        ("may", 5),
        ("june", 6),
        ("july", 7),
        ("august", 8),
        ("september", 9),
        ("october", 10),
        ("november", 11),
        ("december", 12),
    ],
    short_months: &[
        ("jan", 1),
        ("feb", 2),
        ("mar", 3),
        ("apr", 4),
        ("jun", 6),
        ("jul", 7),
        ("aug", 8),
        ("sep", 9),
        ("oct", 10),
        ("nov", 11),
        ("dec", 12),
    ],
    weekdays: &[
        ("monday", 0),
        ("tuesday", 1),
        ("wednesday", 2),
        ("thursday", 3),
        ("friday", 4),
        ("saturday", 5),
        ("sunday", 6),
    ],
    short_weekdays: &[
        ("mon", 0),
        ("tue", 1),
        ("wed", 2),
        ("thu", 3),
        ("fri", 4),
        ("sat", 5),
        ("sun", 6),
    ],
    month_names: [
        "january",
        "february",
        "march",
        "april",
        "may",
        "june",
        "july",
        "august",
        "september",
        "october",
        "november",
        "december",
    ],
    weekday_names: [
        "monday",
        "tuesday",
        "wednesday",
        "thursday",
        "friday",
        "saturday",
        "sunday",
    ],
};

/// Fixed phrase rewrites applied to the text before probing. They fold
/// common idioms into shapes the grammar knows, which keeps the grammar
/// itself small. Order matters: longer phrases come before their
/// substrings.
static FR_SUBSTITUTIONS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"(?i)l['’]après-midi", "de 14h à 18h"),
        (r"(?i)(uniquement )?le matin", "de 8h à 12h"),
        (r"(?i)(uniquement )?en journée", "de 8h à 18h"),
        (r"(?i)(uniquement )?en soirée", "de 18h à 22h"),
        (r"(?i)midi", "12h"),
        (r"(?i)minuit", "23h59"),
        (r"(?i)tous les jours", "du lundi au dimanche"),
        (r"(?i)toute l['’]année", "du 1er janvier au 31 décembre"),
        (r"(?i)jusqu['’]au", "au"),
        (r"(?i)jusqu['’]à", "à"),
        (r"(?i)(à|a) partir de", "de"),
    ]
    .into_iter()
    .map(|(pattern, replacement)| (Regex::new(pattern).unwrap(), replacement))
    .collect()
});

static EN_SUBSTITUTIONS: LazyLock<Vec<(Regex, &'static str)>> =
    LazyLock::new(Vec::new);

pub fn substitutions(locale: Locale) -> &'static [(Regex, &'static str)] {
    match locale {
        Locale::Fr => &FR_SUBSTITUTIONS,
        Locale::En => &EN_SUBSTITUTIONS,
    }
}

/// Apply the locale phrase substitutions to the whole text. Must run
/// before probing so that probe offsets line up with the grammar input.
pub fn apply_substitutions(text: &str, locale: Locale) -> String {
    let mut out = text.to_owned();
    for (pattern, replacement) in substitutions(locale) {
        out = pattern.replace_all(&out, *replacement).into_owned();
    }
    out
}

static MERIDIEM_HINT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\d\s*(am|pm)\b").unwrap());

/// Guess the locale of a text. An am/pm time is a strong English hint;
/// otherwise an unsupported hint falls back to the supported locale
/// yielding the most grammar matches.
pub fn detect_language(text: &str, hint: &str) -> Locale {
    if MERIDIEM_HINT.is_match(text) {
        return Locale::En;
    }
    if let Some(locale) = Locale::from_code(hint) {
        return locale;
    }
    let mut best = Locale::Fr;
    let mut best_count = 0;
    for locale in Locale::all() {
        let count = crate::parse_spanned(text, locale, None).len();
        if count > best_count {
            best_count = count;
            best = locale;
        }
    }
    best
}
