/// Optional per-request diagnostics, passed through verbatim by the dispatcher and fabric.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DiagnosticInfo {
    pub symbolic_id: Option<i32>,
    pub namespace_uri_index: Option<i32>,
    pub localized_text_index: Option<i32>,
    pub locale_index: Option<i32>,
    pub additional_info: Option<String>,
    pub inner: Option<Box<DiagnosticInfo>>,
}
