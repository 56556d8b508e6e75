use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::places::types::{LatLng, Restaurant};

const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    #[default]
    Distance,
    Name,
    Rating,
}

/// Great-circle distance in kilometres.
pub fn haversine_km(from: LatLng, to: LatLng) -> f64 {
    let d_lat = (to.lat - from.lat).to_radians();
    let d_lng = (to.lng - from.lng).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + from.lat.to_radians().cos() * to.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// Appends the unaccented base letters of a lowercase `c` to `key`.
fn fold_into(key: &mut String, c: char) {
    let base = match c {
        'ß' => return key.push_str("ss"),
        'æ' => return key.push_str("ae"),
        'œ' => return key.push_str("oe"),
        'þ' => return key.push_str("th"),
        'ĳ' => return key.push_str("ij"),
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => 'a',
        'ç' | 'ć' | 'ĉ' | 'ċ' | 'č' => 'c',
        'ď' | 'đ' | 'ð' => 'd',
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ĕ' | 'ė' | 'ę' | 'ě' => 'e',
        'ĝ' | 'ğ' | 'ġ' | 'ģ' => 'g',
        'ĥ' | 'ħ' => 'h',
        'ì' | 'í' | 'î' | 'ï' | 'ĩ' | 'ī' | 'ĭ' | 'į' | 'ı' => 'i',
        'ĵ' => 'j',
        'ķ' => 'k',
        'ĺ' | 'ļ' | 'ľ' | 'ŀ' | 'ł' => 'l',
        'ñ' | 'ń' | 'ņ' | 'ň' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ŏ' | 'ő' | 'ơ' => 'o',
        'ŕ' | 'ŗ' | 'ř' => 'r',
        'ś' | 'ŝ' | 'ş' | 'š' | 'ș' => 's',
        'ţ' | 'ť' | 'ŧ' | 'ț' => 't',
        'ù' | 'ú' | 'û' | 'ü' | 'ũ' | 'ū' | 'ŭ' | 'ů' | 'ű' | 'ų' | 'ư' => 'u',
        'ŵ' => 'w',
        'ý' | 'ÿ' | 'ŷ' => 'y',
        'ź' | 'ż' | 'ž' => 'z',
        // Vietnamese letters with stacked diacritics.
        '\u{1EA0}'..='\u{1EB7}' => 'a',
        '\u{1EB8}'..='\u{1EC7}' => 'e',
        '\u{1EC8}'..='\u{1ECB}' => 'i',
        '\u{1ECC}'..='\u{1EE3}' => 'o',
        '\u{1EE4}'..='\u{1EF1}' => 'u',
        '\u{1EF2}'..='\u{1EF9}' => 'y',
        other => other,
    };
    key.push(base);
}

fn collation_key(name: &str) -> String {
    let mut key = String::with_capacity(name.len());
    for c in name.chars().flat_map(char::to_lowercase) {
        fold_into(&mut key, c);
    }
    key
}

/// Case- and accent-insensitive comparison, falling back to the raw strings
/// so that names differing only in case still order deterministically.
///
/// Folding covers Latin-1, Latin Extended-A, the Romanian comma letters and
/// Vietnamese. Letters outside those blocks (Greek, Cyrillic, CJK) compare by
/// their lowercase code points.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    collation_key(a)
        .cmp(&collation_key(b))
        .then_with(|| a.cmp(b))
}

/// Sorts in place. All modes are stable; distance without an origin keeps upstream order.
pub fn sort_restaurants(restaurants: &mut [Restaurant], mode: SortMode, origin: Option<LatLng>) {
    match mode {
        SortMode::Distance => {
            if let Some(origin) = origin {
                restaurants.sort_by(|a, b| {
                    haversine_km(origin, a.location()).total_cmp(&haversine_km(origin, b.location()))
                });
            }
        }
        SortMode::Name => restaurants.sort_by(|a, b| compare_names(&a.name, &b.name)),
        SortMode::Rating => restaurants.sort_by(|a, b| {
            b.rating
                .unwrap_or(0.0)
                .total_cmp(&a.rating.unwrap_or(0.0))
        }),
    }
}

/// Keeps only results rated at least `min_rating`. Unrated results are removed.
pub fn apply_min_rating(restaurants: &mut Vec<Restaurant>, min_rating: Option<f64>) {
    if let Some(min) = min_rating {
        restaurants.retain(|r| r.rating.is_some_and(|rating| rating >= min));
    }
}
