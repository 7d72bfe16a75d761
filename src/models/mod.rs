//! Document models for templates and portfolios.

pub mod portfolio;
pub mod section;
pub mod template;

pub use portfolio::{
    validate_subdomain, LayoutSettings, Portfolio, PortfolioSettings, SectionContent,
};
pub use section::{capitalize, SectionName, SectionShape};
pub use template::{
    Animation, ColorMap, ColorScheme, FontPairing, FontSet, Layout, LayoutStructure,
    ResponsiveLayout, SectionDefinition, SectionVariant, Spacing, StylePreset, Template,
    TemplateCategory, TemplateSummary, ThemeOptions,
};
