use lcms2::{InfoType, Locale, Profile};

use crate::report::MetadataEntry;

pub const TAG_ICC_PROFILE: &str = "ICC profile";

/// Human readable description stored in an embedded ICC profile.
pub fn profile_description(icc: &[u8]) -> Option<String> {
    let profile = match Profile::new_icc(icc) {
        Ok(profile) => profile,
        Err(e) => {
            tracing::debug!("Failed constructing lcms2 profile from ICC data -> {e}");
            return None;
        }
    };

    profile
        .info(InfoType::Description, Locale::none())
        .map(|desc| desc.trim().to_string())
        .filter(|desc| !desc.is_empty())
}

pub fn icc_entry(icc: &[u8]) -> Option<MetadataEntry> {
    profile_description(icc).map(|desc| MetadataEntry::new(TAG_ICC_PROFILE, desc))
}
