//! Verification prompt template.
//!
//! Both models receive exactly the same text. The prompt names the provider
//! page and the target download speed, and asks for a single JSON object with
//! the fields the response parser reads.

/// Render the plan-extraction prompt for `provider_url` and `download_speed` (Mbps).
#[must_use]
pub fn verification_prompt(provider_url: &str, download_speed: u32) -> String {
    format!(
        r#"## Task: Extract NBN Internet Plan Details (JSON Output)

Visit the website and extract the details of the NBN internet plan whose download speed matches the target below. Report the latest price shown on the website for that same plan.

**Website Content:** {provider_url}

**Target Download Speed:** {download_speed} Mbps

**Instructions:**

1. **Fetch and parse the HTML** at {provider_url}. Use the document structure (tables, list items, `div` containers) to see which values belong to which plan. Ignore headers, footers, scripts, SVG and promotional banners.

2. **Identify the matching plan.** Find one complete plan whose download speed is exactly {download_speed} Mbps. Every extracted value must come from that plan's own container. Never take a price from a neighbouring plan.

3. **Extract, exactly as presented:**
    * **plan_name:** (String) official plan name, e.g. "NBN 250/25".
    * **price:** (Number) monthly price without currency symbols, e.g. 119.0.
    * **price_string:** (String) price as displayed, e.g. "$119.00/month".
    * **download_speed:** (String) download speed as displayed, e.g. "100Mbps".
    * **upload_speed:** (String) upload speed as displayed, e.g. "20Mbps".
    * **promotion_details:** (String or Null) promotion text, e.g. "For 6 months then $110/mth". Null when there is none.
    * **plan_details:** (String) other relevant details, e.g. "Unlimited data".

**Search strategy (in priority order):**

1. `<table>` elements, especially `class='table'`.
2. `<div class='swiper'>` carousels and their `swiper-slide` children.

**Output Format: JSON REQUIRED**

Return the ENTIRE response as one valid JSON object with exactly this structure:

```json
{{
    "plan_name": "[plan_name]",
    "price": [price as number],
    "price_string": "[price_string]",
    "download_speed": "[download_speed]",
    "upload_speed": "[upload_speed]",
    "promotion_details": "[promotion_details or Null]",
    "plan_details": "[plan_details]",
    "verified": true,
    "confidence": [score between 0.0 and 1.0 for match quality; aim for >= 0.8 to verify],
    "match_criteria": {{
        "speed_match": [true if the download speed is exactly {download_speed}Mbps, otherwise false]
    }}
}}
```"#
    )
}
