use chrono::NaiveDate;
use geo::Coord;

/// Placeholder used when no place name is known
pub const DEFAULT_LOCATION: &str = "location";

/// Base file name of an export, shared by every file in the archive:
/// `{location}_{scale}_{n|s}{lat}_{e|w}{lon:03}_{MM.YY}_{suffix}`
pub fn base_name(
    location_slug: &str,
    scale_label: &str,
    center_lon_lat: Coord,
    date: NaiveDate,
    suffix: &str,
) -> String {
    let Coord { x: lon, y: lat } = center_lon_lat;
    let ns = if lat < 0. { 's' } else { 'n' };
    let ew = if lon < 0. { 'w' } else { 'e' };

    let scale: String = scale_label.chars().filter(|c| !c.is_whitespace()).collect();

    format!(
        "{location_slug}_{scale}_{ns}{}_{ew}{:03}_{}_{suffix}",
        degrees(lat),
        degrees(lon),
        date.format("%m.%y")
    )
}

fn degrees(value: f64) -> u32 {
    value.floor().abs() as u32
}

/// Lower case ascii words joined by '-', "location" if nothing is left
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        let c = fold_accent(c);
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }

    if slug.is_empty() {
        DEFAULT_LOCATION.to_string()
    } else {
        slug
    }
}

fn fold_accent(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ä' | 'À' | 'Â' => 'a',
        'ç' | 'Ç' => 'c',
        'è' | 'é' | 'ê' | 'ë' | 'É' | 'È' => 'e',
        'î' | 'ï' => 'i',
        'ô' | 'ö' => 'o',
        'ù' | 'û' | 'ü' => 'u',
        _ => c,
    }
}
