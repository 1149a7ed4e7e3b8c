//! Instruction text and part ordering for model generation and edits.
//!
//! Each reference image is preceded by a short text part naming its role,
//! so the model can tell the face from the outfit from the background.

use vmodel_core::assets::{AssetBag, AssetKey};
use vmodel_core::image_asset::ImageAsset;

use crate::messages::Part;

const GENERATE_INSTRUCTION: &str = "Create a photorealistic, full-body fashion portrait of a \
single virtual model. Use the labelled reference images for the model's face, outfit and \
background where they are provided, keeping the face identity and garment details faithful. \
Return one image only.";

const EDIT_INSTRUCTION: &str = "Edit the base image of the virtual model. Keep the person's \
identity, pose and framing unless the instruction says otherwise, and change only what is \
requested. Return one image only.";

const IMAGE_ONLY_EDIT: &str = "Apply the labelled reference images to the base image.";

fn generation_role(key: AssetKey) -> &'static str {
    match key {
        AssetKey::Face => "Face reference: use this person's face and identity.",
        AssetKey::Outfit => "Outfit reference: dress the model in this outfit.",
        AssetKey::Background => "Background reference: place the model in this setting.",
    }
}

fn edit_role(key: AssetKey) -> &'static str {
    match key {
        AssetKey::Face => "Face reference: replace the model's face with this one.",
        AssetKey::Outfit => "Style reference: restyle the clothing to match this image.",
        AssetKey::Background => "Background reference: swap the background for this setting.",
    }
}

fn push_references(parts: &mut Vec<Part>, assets: &AssetBag, role: fn(AssetKey) -> &'static str) {
    for (key, asset) in assets.iter() {
        parts.push(Part::text(role(key)));
        parts.push(Part::image(asset));
    }
}

/// Parts for a new model: references first, then the instruction and prompt.
pub fn generation_parts(assets: &AssetBag, prompt: &str) -> Vec<Part> {
    let mut parts = Vec::with_capacity(assets.len() * 2 + 1);
    push_references(&mut parts, assets, generation_role);

    let prompt = prompt.trim();
    let text = if prompt.is_empty() {
        GENERATE_INSTRUCTION.to_string()
    } else {
        format!("{GENERATE_INSTRUCTION}\n\nDescription: {prompt}")
    };
    parts.push(Part::text(text));
    parts
}

/// Parts for an edit: base image, references, then the instruction.
pub fn edit_parts(base: &ImageAsset, prompt: &str, references: &AssetBag) -> Vec<Part> {
    let mut parts = Vec::with_capacity(references.len() * 2 + 3);
    parts.push(Part::text("Base image:"));
    parts.push(Part::image(base));
    push_references(&mut parts, references, edit_role);

    let prompt = prompt.trim();
    let request = if prompt.is_empty() {
        IMAGE_ONLY_EDIT
    } else {
        prompt
    };
    parts.push(Part::text(format!(
        "{EDIT_INSTRUCTION}\n\nInstruction: {request}"
    )));
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(payload: &str) -> ImageAsset {
        ImageAsset::from_base64("image/png", payload).unwrap()
    }

    #[test]
    fn generation_labels_each_reference() {
        let mut assets = AssetBag::new();
        assets.set(AssetKey::Background, asset("QkJC"));
        assets.set(AssetKey::Face, asset("RkZG"));

        let parts = generation_parts(&assets, "studio photo");

        assert_eq!(parts.len(), 5);
        assert!(parts[0].text.as_deref().unwrap().starts_with("Face reference"));
        assert_eq!(parts[1].inline_data.as_ref().unwrap().data, "RkZG");
        assert!(parts[2].text.as_deref().unwrap().starts_with("Background reference"));
        assert_eq!(parts[3].inline_data.as_ref().unwrap().data, "QkJC");
        assert!(parts[4].text.as_deref().unwrap().ends_with("Description: studio photo"));
    }

    #[test]
    fn edit_puts_base_image_first() {
        let base = asset("QkFTRQ==");
        let parts = edit_parts(&base, "add hat", &AssetBag::new());

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[1].inline_data.as_ref().unwrap().data, "QkFTRQ==");
        assert!(parts[2].text.as_deref().unwrap().ends_with("Instruction: add hat"));
    }

    #[test]
    fn blank_edit_prompt_falls_back_to_reference_instruction() {
        let mut refs = AssetBag::new();
        refs.set(AssetKey::Outfit, asset("T1VU"));
        let parts = edit_parts(&asset("QkFTRQ=="), "   ", &refs);

        assert_eq!(parts.len(), 5);
        assert!(parts[2].text.as_deref().unwrap().starts_with("Style reference"));
        assert!(parts[4].text.as_deref().unwrap().ends_with(IMAGE_ONLY_EDIT));
    }
}
