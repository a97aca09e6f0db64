//! Announcement wording. Numbers are zero-padded to three digits and every digit is
//! spoken as its own word so the call stays intelligible over hall speakers.

/// Language of the spoken announcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phrasebook {
    Indonesian,
    English,
}

const ID_DIGITS: [&str; 10] = [
    "nol", "satu", "dua", "tiga", "empat", "lima", "enam", "tujuh", "delapan", "sembilan",
];

const EN_DIGITS: [&str; 10] = [
    "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine",
];

impl Phrasebook {
    /// Pick by BCP-47 tag: `en*` is English, anything else Indonesian.
    pub fn for_lang(lang: &str) -> Self {
        if lang.trim().to_ascii_lowercase().starts_with("en") {
            Phrasebook::English
        } else {
            Phrasebook::Indonesian
        }
    }

    fn digits(&self) -> &'static [&'static str; 10] {
        match self {
            Phrasebook::Indonesian => &ID_DIGITS,
            Phrasebook::English => &EN_DIGITS,
        }
    }

    /// `"1, 0, 7"` spelled out, comma separated.
    pub fn spell_number(&self, number: u32) -> String {
        let words = self.digits();
        format!("{:03}", number)
            .chars()
            .filter_map(|c| c.to_digit(10))
            .map(|d| words[d as usize])
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn announcement(&self, prefix: &str, number: u32, counter_name: &str) -> String {
        let digits = self.spell_number(number);
        match self {
            Phrasebook::Indonesian => {
                format!("Nomor antrian {prefix}, {digits}, silakan menuju ke {counter_name}")
            }
            Phrasebook::English => {
                format!("Queue number {prefix}, {digits}, please proceed to {counter_name}")
            }
        }
    }
}
