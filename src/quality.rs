/// Flags addresses too coarse to name a specific venue.
///
/// Street-level addresses almost always carry a house number or postal code, so an
/// address without any decimal digit is treated as city/region level. Absent
/// addresses count as locality level too.
pub fn is_locality_level(formatted_address: Option<&str>) -> bool {
    match formatted_address {
        Some(address) => !address.chars().any(|c| c.is_ascii_digit()),
        None => true,
    }
}
