// SPDX-FileCopyrightText: 2026 Chowkidar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Keyword vocabularies for intent and emotion matching.
//!
//! Lists are configuration with compiled defaults (English + romanized
//! Hindi). Matching is case-folded and substring-based on whole words or
//! word sequences: the transcript is folded into a space-joined token
//! string and phrases are matched with surrounding spaces.

use chowkidar_config::VocabConfig;

/// Fold text into ` token token ... ` form for phrase matching.
pub fn fold(text: &str) -> String {
    let lowered = text.to_lowercase();
    let tokens: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();
    format!(" {} ", tokens.join(" "))
}

/// True when the folded text contains the phrase as whole words.
pub fn contains_phrase(folded: &str, phrase: &str) -> bool {
    folded.contains(&format!(" {} ", phrase))
}

/// The resolved keyword lists used by the pipeline.
#[derive(Debug, Clone)]
pub struct VocabSet {
    pub threat: Vec<String>,
    pub distress: Vec<String>,
    /// Emotion-only distress markers, weaker than `distress`.
    pub distress_soft: Vec<String>,
    pub scam: Vec<String>,
    pub occupancy: Vec<String>,
    pub identity: Vec<String>,
    pub entry: Vec<String>,
    pub government: Vec<String>,
    pub staff: Vec<String>,
    pub donation: Vec<String>,
    pub sales: Vec<String>,
    pub child_elderly: Vec<String>,
    pub hydration: Vec<String>,
    pub delivery: Vec<String>,
    pub visitor: Vec<String>,
    pub package_objects: Vec<String>,
}

impl Default for VocabSet {
    fn default() -> Self {
        Self {
            threat: strings(&[
                "kill", "attack", "smash", "threat", "punch", "fight", "break down",
                "maar", "maarunga", "maar dunga", "todenge", "tod dunga", "warna",
                "dhamki", "chaku", "goli", "jaan se", "darwaza tod", "khatam",
                "barbad", "dekh lena",
            ]),
            distress: strings(&[
                "help", "emergency", "accident", "fire", "ambulance", "hospital",
                "blood", "injured", "hurt", "bachao", "madad", "aag", "khoon",
                "chot", "dard",
            ]),
            distress_soft: strings(&["please", "scared", "afraid", "kripya"]),
            scam: strings(&[
                "otp", "verification code", "upi", "qr", "qr scan", "bank",
                "account number", "refund", "kyc", "aadhaar", "pan card",
                "lottery", "prize", "winner",
            ]),
            occupancy: strings(&[
                "anyone home", "is anyone", "home alone", "alone at home",
                "koi ghar pe", "koi hai", "ghar pe hai", "kaun hai ghar",
                "owner hai kya", "ghar khali",
            ]),
            identity: strings(&[
                "i know the owner", "know the owner", "owner told me", "relative",
                "relative hoon", "owner ne bola", "family member", "friend hoon",
                "chacha hoon", "mama hoon", "ghar wale",
            ]),
            entry: strings(&[
                "let me in", "open the door", "open the gate", "unlock",
                "come inside", "enter", "andar aana", "andar aane", "darwaza khol",
                "gate khol", "khol do", "kholo", "aane do",
            ]),
            government: strings(&[
                "electricity", "gas", "water board", "police", "tax", "inspection",
                "meter reading", "government", "court", "legal notice", "sarkari",
                "bijli", "census", "survey",
            ]),
            staff: strings(&[
                "maid", "driver", "cook", "helper", "bai", "kaam karungi",
                "kaam karta", "kaam wali", "safai", "chaabi",
            ]),
            donation: strings(&[
                "donation", "chanda", "temple", "mandir", "church", "masjid",
                "gurudwara", "festival", "puja", "havan", "bhagwan", "ganpati",
                "durga",
            ]),
            sales: strings(&[
                "demo", "free demo", "offer", "discount", "insurance", "policy",
                "sales", "broadband", "loan", "purifier", "water purifier",
            ]),
            child_elderly: strings(&[
                "mummy", "papa", "bachcha", "uncle", "aunty", "grandma", "grandpa",
                "dadi", "dada",
            ]),
            hydration: strings(&["water", "paani", "paani milega", "thirsty", "pyaas"]),
            delivery: strings(&[
                "package", "delivery", "courier", "parcel", "amazon", "flipkart",
                "swiggy", "zomato", "order", "cod", "dhl",
            ]),
            visitor: strings(&[
                "owner", "meet", "speak", "talk", "appointment", "friend",
                "family", "milna",
            ]),
            package_objects: strings(&[
                "package", "box", "parcel", "backpack", "suitcase", "handbag", "bag",
            ]),
        }
    }
}

impl VocabSet {
    /// Build the vocabulary, replacing any category the config overrides.
    pub fn from_config(config: &VocabConfig) -> Self {
        let mut vocab = Self::default();
        let overrides = [
            (&mut vocab.threat, &config.threat),
            (&mut vocab.distress, &config.distress),
            (&mut vocab.scam, &config.scam),
            (&mut vocab.occupancy, &config.occupancy),
            (&mut vocab.identity, &config.identity),
            (&mut vocab.entry, &config.entry),
            (&mut vocab.government, &config.government),
            (&mut vocab.staff, &config.staff),
            (&mut vocab.donation, &config.donation),
            (&mut vocab.sales, &config.sales),
            (&mut vocab.child_elderly, &config.child_elderly),
            (&mut vocab.delivery, &config.delivery),
            (&mut vocab.visitor, &config.visitor),
            (&mut vocab.package_objects, &config.package_objects),
        ];
        for (target, source) in overrides {
            if let Some(list) = source {
                *target = list.iter().map(|s| s.to_lowercase()).collect();
            }
        }
        vocab
    }

    /// True when the folded transcript contains any phrase of the list.
    pub fn matches(&self, folded: &str, list: &[String]) -> bool {
        list.iter().any(|phrase| contains_phrase(folded, phrase))
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fold_strips_punctuation_and_case() {
        assert_eq!(fold("Koi ghar pe hai?"), " koi ghar pe hai ");
        assert_eq!(fold("I have a PACKAGE!"), " i have a package ");
    }

    #[test]
    fn phrases_match_whole_words_only() {
        let folded = fold("the otp is needed");
        assert!(contains_phrase(&folded, "otp"));
        // "otp" inside another word does not match.
        let folded = fold("photopolymer coating");
        assert!(!contains_phrase(&folded, "otp"));
    }

    #[test]
    fn bigrams_match_across_tokens() {
        let folded = fold("please share the verification code now");
        assert!(contains_phrase(&folded, "verification code"));
    }

    #[test]
    fn default_lists_catch_canonical_phrases() {
        let vocab = VocabSet::default();
        assert!(vocab.matches(&fold("I have a package delivery"), &vocab.delivery));
        assert!(vocab.matches(&fold("koi ghar pe hai"), &vocab.occupancy));
        assert!(vocab.matches(&fold("share your otp"), &vocab.scam));
        assert!(vocab.matches(&fold("darwaza khol warna"), &vocab.entry));
    }

    #[test]
    fn config_override_replaces_category() {
        let config = VocabConfig {
            threat: Some(vec!["Banana".into()]),
            ..VocabConfig::default()
        };
        let vocab = VocabSet::from_config(&config);
        assert!(vocab.matches(&fold("banana incoming"), &vocab.threat));
        assert!(!vocab.matches(&fold("kill"), &vocab.threat));
        // Untouched categories keep their defaults.
        assert!(vocab.matches(&fold("otp"), &vocab.scam));
    }
}
