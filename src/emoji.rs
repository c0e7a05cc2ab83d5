//! Gitmoji shortcodes (`:tada:`) to their unicode emoji

use std::collections::HashMap;

use once_cell::sync::Lazy;

static SHORTCODES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("art", "🎨"),
        ("zap", "⚡️"),
        ("fire", "🔥"),
        ("bug", "🐛"),
        ("ambulance", "🚑️"),
        ("sparkles", "✨"),
        ("memo", "📝"),
        ("rocket", "🚀"),
        ("lipstick", "💄"),
        ("tada", "🎉"),
        ("white_check_mark", "✅"),
        ("lock", "🔒️"),
        ("closed_lock_with_key", "🔐"),
        ("bookmark", "🔖"),
        ("rotating_light", "🚨"),
        ("construction", "🚧"),
        ("green_heart", "💚"),
        ("arrow_down", "⬇️"),
        ("arrow_up", "⬆️"),
        ("pushpin", "📌"),
        ("construction_worker", "👷"),
        ("chart_with_upwards_trend", "📈"),
        ("recycle", "♻️"),
        ("heavy_plus_sign", "➕"),
        ("heavy_minus_sign", "➖"),
        ("wrench", "🔧"),
        ("hammer", "🔨"),
        ("globe_with_meridians", "🌐"),
        ("pencil2", "✏️"),
        ("poop", "💩"),
        ("rewind", "⏪️"),
        ("twisted_rightwards_arrows", "🔀"),
        ("package", "📦️"),
        ("alien", "👽️"),
        ("truck", "🚚"),
        ("page_facing_up", "📄"),
        ("boom", "💥"),
        ("bento", "🍱"),
        ("wheelchair", "♿️"),
        ("bulb", "💡"),
        ("beers", "🍻"),
        ("speech_balloon", "💬"),
        ("card_file_box", "🗃️"),
        ("loud_sound", "🔊"),
        ("mute", "🔇"),
        ("busts_in_silhouette", "👥"),
        ("children_crossing", "🚸"),
        ("building_construction", "🏗️"),
        ("iphone", "📱"),
        ("clown_face", "🤡"),
        ("egg", "🥚"),
        ("see_no_evil", "🙈"),
        ("camera_flash", "📸"),
        ("alembic", "⚗️"),
        ("mag", "🔍️"),
        ("label", "🏷️"),
        ("seedling", "🌱"),
        ("triangular_flag_on_post", "🚩"),
        ("goal_net", "🥅"),
        ("dizzy", "💫"),
        ("wastebasket", "🗑️"),
        ("passport_control", "🛂"),
        ("adhesive_bandage", "🩹"),
        ("monocle_face", "🧐"),
        ("coffin", "⚰️"),
        ("test_tube", "🧪"),
        ("necktie", "👔"),
        ("stethoscope", "🩺"),
        ("bricks", "🧱"),
        ("technologist", "🧑‍💻"),
        ("money_with_wings", "💸"),
        ("thread", "🧵"),
        ("safety_vest", "🦺"),
    ]
    .into_iter()
    .collect()
});

/// Replace every known `:shortcode:` of `text` by its emoji. Unknown shortcodes are kept verbatim
pub fn parse_emojis(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find(':') {
        let (before, from_colon) = rest.split_at(start);
        result.push_str(before);

        let candidate = &from_colon[1..];
        match candidate.find(':') {
            Some(end) if is_shortcode(&candidate[..end]) => {
                match SHORTCODES.get(&candidate[..end]) {
                    Some(emoji) => {
                        result.push_str(emoji);
                        rest = &candidate[end + 1..];
                    },
                    None => {
                        result.push(':');
                        rest = candidate;
                    },
                }
            },
            _ => {
                result.push(':');
                rest = candidate;
            },
        }
    }
    result.push_str(rest);
    result
}

/// The form used to compare commit messages, so that `:tada: release` and `🎉 release` are considered equal
pub fn normalize(text: &str) -> String {
    // Emoji variation selectors are not always preserved by providers
    parse_emojis(text).replace('\u{fe0f}', "").trim().to_string()
}

fn is_shortcode(s: &str) -> bool {
    s.is_empty() == false
        && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '+' || c == '-')
}
