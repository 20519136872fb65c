// src/messages.rs

pub fn verified_message(name: &str) -> String {
    format!(
        "🎉 Dear {}, your profile has been verified successfully. \
        Now you are a premium user with 0 days remaining. Please renew to enjoy the benefits!",
        name
    )
}

pub fn rejected_message(name: &str) -> String {
    format!(
        "❌ Dear {}, your profile has been rejected. \
        Please try again with a different WhatsApp number.",
        name
    )
}

pub fn deleted_message(name: &str) -> String {
    format!(
        "❌ Dear {}, your profile has been deleted by admin. For more details, contact admin.",
        name
    )
}

pub fn renewed_message(total_days: u32) -> String {
    format!(
        "🌟 Membership Renewed!\n\n\
        A big thank-you for your renewal! 💖\n\
        Your total days: 🗓️ {} days\n\
        Your journey with us continues—make it amazing! 🚀",
        total_days
    )
}

pub fn broadcast_message(link: &str) -> String {
    format!(
        "💫 Jackpot alert! 🌟 Your coins are waiting—collect them now! 🪙\n\n{}",
        link
    )
}
