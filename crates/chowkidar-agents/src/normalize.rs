// SPDX-FileCopyrightText: 2026 Chowkidar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Devanagari → romanized keyword normalization for STT transcripts.
//!
//! STT engines transcribing Hindi speech emit Devanagari script (e.g.
//! "ओटीपी") rather than romanized text ("otp"). Normalization appends the
//! romanized equivalents of detected Devanagari keywords so downstream
//! keyword matching works regardless of script. The original text is kept
//! intact; romanized forms are appended after it.

use std::sync::LazyLock;

/// Devanagari phrase → romanized keyword, grouped by domain.
static DEVANAGARI_TO_ROMAN: &[(&str, &str)] = &[
    // --- Scam / financial ---
    ("ओटीपी", "otp"),
    ("ओ टी पी", "otp"),
    ("वेरिफिकेशन कोड", "verification code"),
    ("वेरिफिकेशन", "verification"),
    ("वेरीफिकेशन", "verification"),
    ("वेरिफाई", "verify"),
    ("यूपीआई", "upi"),
    ("यू पी आई", "upi"),
    ("क्यूआर", "qr"),
    ("क्यू आर", "qr"),
    ("स्कैन", "scan"),
    ("अकाउंट नंबर", "account number"),
    ("अकाउंट", "account"),
    ("बैंक", "bank"),
    ("आधार", "aadhaar"),
    ("केवाईसी", "kyc"),
    ("के वाई सी", "kyc"),
    ("पैन कार्ड", "pan card"),
    ("रिफंड", "refund"),
    ("लॉटरी", "lottery"),
    ("प्राइज", "prize"),
    ("विनर", "winner"),
    ("पेमेंट", "payment"),
    ("ट्रांसफर", "transfer"),
    ("पैसा", "paisa"),
    ("पैसे", "paise"),
    ("रुपये", "rupees"),
    ("कैश", "cash"),
    // --- Delivery ---
    ("डिलिवरी", "delivery"),
    ("डिलीवरी", "delivery"),
    ("कूरियर", "courier"),
    ("पार्सल", "parcel"),
    ("पैकेज", "package"),
    ("अमेज़न", "amazon"),
    ("अमेज़ॉन", "amazon"),
    ("फ्लिपकार्ट", "flipkart"),
    ("स्विगी", "swiggy"),
    ("ज़ोमैटो", "zomato"),
    ("ऑर्डर", "order"),
    ("कम्प्लीट", "complete"),
    // --- Aggression / threat ---
    ("देख लेना", "dekh lena"),
    ("मारूंगा", "maarunga"),
    ("मार दूंगा", "maar dunga"),
    ("मार", "maar"),
    ("तोड़ेंगे", "todenge"),
    ("तोड़ दूंगा", "tod dunga"),
    ("वरना", "warna"),
    ("धमकी", "dhamki"),
    ("चाकू", "chaku"),
    ("गोली", "goli"),
    ("जान से", "jaan se"),
    ("दरवाज़ा तोड़", "darwaza tod"),
    ("दरवाजा तोड़", "darwaza tod"),
    ("खोल वरना", "khol warna"),
    ("बर्बाद", "barbad"),
    ("ख़तम", "khatam"),
    ("खतम", "khatam"),
    // --- Distress / emergency ---
    ("बचाओ", "bachao"),
    ("मदद", "madad"),
    ("आग", "aag"),
    ("लगी", "lagi"),
    ("खो गई", "kho gayi"),
    ("खो गया", "kho gaya"),
    ("दर्द", "dard"),
    ("चोट", "chot"),
    ("खून", "khoon"),
    ("हॉस्पिटल", "hospital"),
    ("एम्बुलेंस", "ambulance"),
    ("पुलिस", "police"),
    // --- Occupancy probe ---
    ("कोई घर पे", "koi ghar pe"),
    ("कोई घर पर", "koi ghar pe"),
    ("कोई है", "koi hai"),
    ("घर पे है", "ghar pe hai"),
    ("घर पर है", "ghar pe hai"),
    ("कौन है घर", "kaun hai ghar"),
    ("ओनर है क्या", "owner hai kya"),
    ("घर खाली", "ghar khali"),
    // --- Entry request ---
    ("अंदर आना", "andar aana"),
    ("अंदर आने", "andar aane"),
    ("दरवाज़ा खोल", "darwaza khol"),
    ("दरवाजा खोल", "darwaza khol"),
    ("दरवाज़ा खोलो", "darwaza khol"),
    ("गेट खोल", "gate khol"),
    ("खोलो", "kholo"),
    ("खोल दो", "khol do"),
    ("आने दो", "aane do"),
    // --- Identity / staff claims ---
    ("ओनर ने बोला", "owner ne bola"),
    ("ओनर", "owner"),
    ("रिलेटिव हूं", "relative hoon"),
    ("रिलेटिव", "relative"),
    ("चाचा हूं", "chacha hoon"),
    ("मामा हूं", "mama hoon"),
    ("फ्रेंड हूं", "friend hoon"),
    ("फैमिली मेंबर", "family member"),
    ("घर वाले", "ghar wale"),
    ("काम करूंगी", "kaam karungi"),
    ("काम करता", "kaam karta"),
    ("बाई", "bai"),
    ("मेड", "maid"),
    ("पुरानी बाई", "purani bai"),
    ("सफ़ाई", "safai"),
    ("सफाई", "safai"),
    ("ड्राइवर", "driver"),
    ("चाबी", "chaabi"),
    // --- Government / authority ---
    ("सरकारी", "sarkari"),
    ("गवर्नमेंट", "government"),
    ("कोर्ट", "court"),
    ("लीगल नोटिस", "legal notice"),
    ("टैक्स", "tax"),
    ("इंस्पेक्शन", "inspection"),
    ("बिजली", "bijli"),
    ("इलेक्ट्रिसिटी", "electricity"),
    ("गैस", "gas"),
    ("गैस लीक", "gas leak"),
    ("वॉटर बोर्ड", "water board"),
    ("मीटर रीडिंग", "meter reading"),
    ("सेंसस", "census"),
    ("सर्वे", "survey"),
    // --- Religious / donation ---
    ("चंदा", "chanda"),
    ("डोनेशन", "donation"),
    ("मंदिर", "mandir"),
    ("टेम्पल", "temple"),
    ("मस्जिद", "masjid"),
    ("चर्च", "church"),
    ("गुरुद्वारा", "gurudwara"),
    ("हवन", "havan"),
    ("पूजा", "puja"),
    ("भगवान", "bhagwan"),
    ("गणपति", "ganpati"),
    ("दुर्गा", "durga"),
    // --- Sales ---
    ("फ्री डेमो", "free demo"),
    ("ऑफर", "offer"),
    ("डिस्काउंट", "discount"),
    ("इंश्योरेंस", "insurance"),
    ("पॉलिसी", "policy"),
    ("वाटर प्यूरिफायर", "water purifier"),
    ("प्यूरिफायर", "purifier"),
    ("ब्रॉडबैंड", "broadband"),
    ("लोन", "loan"),
    // --- Child / elderly ---
    ("मम्मी खो गई", "mummy kho gayi"),
    ("मम्मी", "mummy"),
    ("पापा खो गए", "papa kho gaye"),
    ("बच्चा", "bachcha"),
    ("पानी मिलेगा", "paani milega"),
    ("पानी", "paani"),
    ("भाई साहब", "bhai sahab"),
    ("घर नहीं मिल रहा", "ghar nahi mil raha"),
    // --- Common verbs / phrases ---
    ("बता दीजिए", "bata dijiye"),
    ("बता दीजे", "bata dijiye"),
    ("पता दीजे", "bata dijiye"),
    ("पता दीजिए", "bata dijiye"),
    ("बताओ", "batao"),
    ("बता दो", "bata do"),
    ("कर दीजिए", "kar dijiye"),
    ("कर दो", "kar do"),
    ("ज़रूरी", "zaroori"),
    ("जरूरी", "zaroori"),
    ("बहुत ज़रूरी", "bahut zaroori"),
];

/// Mapping sorted longest-phrase-first so compound phrases match before
/// their substrings.
static SORTED_MAPPING: LazyLock<Vec<(&'static str, &'static str)>> = LazyLock::new(|| {
    let mut mapping: Vec<_> = DEVANAGARI_TO_ROMAN.to_vec();
    mapping.sort_by_key(|(dev, _)| std::cmp::Reverse(dev.chars().count()));
    mapping
});

/// True when the text contains any Devanagari codepoint (U+0900..U+097F).
pub fn has_devanagari(text: &str) -> bool {
    text.chars().any(|c| ('\u{0900}'..='\u{097F}').contains(&c))
}

/// Normalize a transcript that may contain Devanagari script.
///
/// Returns the original text with romanized equivalents of any detected
/// Devanagari keywords appended, separated by spaces. Already-romanized
/// text is returned unchanged.
pub fn normalize_transcript(text: &str) -> String {
    if text.is_empty() || !has_devanagari(text) {
        return text.to_string();
    }

    let lowered = text.to_lowercase();
    let mut romanized: Vec<&str> = Vec::new();
    for &(devanagari, roman) in SORTED_MAPPING.iter() {
        if lowered.contains(devanagari) && !romanized.contains(&roman) {
            romanized.push(roman);
        }
    }

    if romanized.is_empty() {
        return text.to_string();
    }
    format!("{} {}", text, romanized.join(" "))
}
