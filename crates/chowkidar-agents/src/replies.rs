// SPDX-FileCopyrightText: 2026 Chowkidar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Canned reply templates and reply safety screening.
//!
//! Reply text must never reveal internal risk scores, model outputs, or
//! occupancy. Generated text failing the screen is replaced by the canned
//! line for the classified intent and the incident is audited.

use std::sync::LazyLock;

use regex::Regex;

use chowkidar_core::Intent;

/// Canned line spoken on every escalation, regardless of reply provider.
pub const SECURITY_LINE: &str = "I have notified the owner and the security guard.";

/// Verbatim reply for occupancy probes; confirms nothing about the house.
pub const OCCUPANCY_LINE: &str = "Please wait while I notify the owner.";

/// Neutral default when no intent-specific template applies.
pub const NOTIFY_LINE: &str = "Please wait while I notify the owner.";

/// Fallback for conversational follow-ups when the reply provider fails.
pub const FOLLOW_UP_FALLBACK: &str = "Thank you, the owner has been notified.";

/// Fixed neutral template for a classified intent.
pub fn canned_reply(intent: Intent) -> &'static str {
    match intent {
        Intent::Delivery => "Please leave the package at the doorstep.",
        Intent::Help => "Help is on the way. The owner has been alerted.",
        Intent::Visitor => "Please wait while I let the owner know you are here.",
        Intent::ReligiousDonation => {
            "Thank you for visiting. The owner is not taking donations at the door."
        }
        Intent::DomesticStaff => "Please wait while I confirm with the owner.",
        Intent::SalesMarketing => "The owner is not interested in offers at the door. Thank you.",
        Intent::ChildElderly => "Please stay right there, someone will help you shortly.",
        Intent::GovernmentClaim => {
            "Please hold your identification to the camera and wait for the owner."
        }
        Intent::OccupancyProbe => OCCUPANCY_LINE,
        Intent::Unknown
        | Intent::Aggression
        | Intent::ScamAttempt
        | Intent::IdentityClaim
        | Intent::EntryRequest => NOTIFY_LINE,
    }
}

/// Forbidden reply patterns, each tagged with its violation class.
static FORBIDDEN_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    vec![
        // Occupancy-confirming phrasing.
        (
            "occupancy",
            Regex::new(r"(?i)\b(no one|nobody)\b.{0,24}\b(home|house|inside)\b").unwrap(),
        ),
        ("occupancy", Regex::new(r"(?i)\bhome alone\b").unwrap()),
        (
            "occupancy",
            Regex::new(r"(?i)\bowner is (out|away|not (at )?home)\b").unwrap(),
        ),
        ("occupancy", Regex::new(r"(?i)\bhouse is empty\b").unwrap()),
        // Credential echoing.
        (
            "credential",
            Regex::new(r"(?i)\b(otp|pin|passcode|password)\b.{0,24}\b\d{4,8}\b").unwrap(),
        ),
        (
            "credential",
            Regex::new(r"(?i)\b\d{4,8}\b.{0,24}\b(otp|pin|passcode|password)\b").unwrap(),
        ),
        // Shell-injection indicators.
        ("shell", Regex::new(r"[;|`$\\]|&&").unwrap()),
        // Internal state leakage.
        (
            "internal",
            Regex::new(r"(?i)\b(risk score|risk_score|model output|confidence score)\b").unwrap(),
        ),
    ]
});

/// Screen a generated reply. Returns the violation class on failure.
pub fn screen_reply(text: &str) -> Result<(), &'static str> {
    for (label, pattern) in FORBIDDEN_PATTERNS.iter() {
        if pattern.is_match(text) {
            return Err(label);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canned_replies_pass_their_own_screen() {
        for intent in [
            Intent::Aggression,
            Intent::Help,
            Intent::ScamAttempt,
            Intent::OccupancyProbe,
            Intent::IdentityClaim,
            Intent::EntryRequest,
            Intent::GovernmentClaim,
            Intent::DomesticStaff,
            Intent::ReligiousDonation,
            Intent::SalesMarketing,
            Intent::ChildElderly,
            Intent::Delivery,
            Intent::Visitor,
            Intent::Unknown,
        ] {
            assert!(
                screen_reply(canned_reply(intent)).is_ok(),
                "canned reply for {intent} failed the screen"
            );
        }
        assert!(screen_reply(SECURITY_LINE).is_ok());
    }

    #[test]
    fn occupancy_confirming_replies_are_rejected() {
        assert_eq!(screen_reply("No one is home right now."), Err("occupancy"));
        assert_eq!(screen_reply("The owner is away."), Err("occupancy"));
    }

    #[test]
    fn credential_echo_is_rejected() {
        assert_eq!(screen_reply("Your OTP is 482913."), Err("credential"));
        assert_eq!(screen_reply("482913 is the otp"), Err("credential"));
    }

    #[test]
    fn shell_indicators_are_rejected() {
        assert_eq!(screen_reply("hello; rm -rf /"), Err("shell"));
        assert_eq!(screen_reply("a && b"), Err("shell"));
    }

    #[test]
    fn internal_state_leak_is_rejected() {
        assert_eq!(
            screen_reply("Your risk score is 0.92, please leave."),
            Err("internal")
        );
    }

    #[test]
    fn plain_replies_pass() {
        assert!(screen_reply("Please wait at the door.").is_ok());
    }
}
