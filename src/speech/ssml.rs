//! SSML document template

use handlebars::Handlebars;
use serde::Serialize;

use crate::config::SpeechConfig;
use crate::error::{Error, Result};

const TEMPLATE_NAME: &str = "ssml";

/// SSML used for every synthesis request. Handlebars escapes the text.
pub const DEFAULT_SSML_TEMPLATE: &str = r#"<speak version="1.0" xmlns="http://www.w3.org/2001/10/synthesis" xmlns:mstts="https://www.w3.org/2001/mstts" xml:lang="{{xml_lang}}">
<voice name="{{voice_name}}">
<mstts:express-as style="{{style}}" styledegree="{{style_degree}}">
{{text}}
</mstts:express-as>
</voice>
</speak>"#;

#[derive(Serialize)]
struct SsmlData<'a> {
    xml_lang: &'a str,
    voice_name: &'a str,
    style: &'a str,
    style_degree: &'a str,
    text: &'a str,
}

/// Voice settings plus the compiled template
pub struct SsmlTemplate {
    registry: Handlebars<'static>,
    xml_lang: String,
    voice_name: String,
    style: String,
    style_degree: String,
}

impl SsmlTemplate {
    /// Compile the default template for the configured voice
    pub fn new(config: &SpeechConfig) -> Result<Self> {
        Self::with_template(config, DEFAULT_SSML_TEMPLATE)
    }

    /// Compile a custom template
    pub fn with_template(config: &SpeechConfig, template: &str) -> Result<Self> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        registry
            .register_template_string(TEMPLATE_NAME, template)
            .map_err(|e| Error::Template(format!("Invalid SSML template: {}", e)))?;

        Ok(SsmlTemplate {
            registry,
            xml_lang: config.xml_lang.clone(),
            voice_name: config.voice_name.clone(),
            style: config.style.clone(),
            style_degree: config.style_degree.clone(),
        })
    }

    /// Render the document for `text`
    pub fn render(&self, text: &str) -> Result<String> {
        let data = SsmlData {
            xml_lang: &self.xml_lang,
            voice_name: &self.voice_name,
            style: &self.style,
            style_degree: &self.style_degree,
            text,
        };
        Ok(self.registry.render(TEMPLATE_NAME, &data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_uses_voice_settings() {
        let template = SsmlTemplate::new(&SpeechConfig::default()).unwrap();
        let ssml = template.render("你好").unwrap();

        assert!(ssml.contains(r#"xml:lang="zh-CN""#));
        assert!(ssml.contains(r#"<voice name="zh-CN-XiaochenNeural">"#));
        assert!(ssml.contains(r#"style="live_commercial" styledegree="2""#));
        assert!(ssml.contains("\n你好\n"));
    }

    #[test]
    fn test_render_escapes_markup() {
        let template = SsmlTemplate::new(&SpeechConfig::default()).unwrap();
        let ssml = template.render("a < b & \"c\"").unwrap();
        assert!(ssml.contains("a &lt; b &amp; &quot;c&quot;"));
    }

    #[test]
    fn test_invalid_template_rejected() {
        let result = SsmlTemplate::with_template(&SpeechConfig::default(), "{{#if text}}unclosed");
        assert!(matches!(result, Err(Error::Template(_))));
    }
}
