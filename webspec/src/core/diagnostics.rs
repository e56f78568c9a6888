//! Diagnostics: the only channel for reporting compile-time failures.
//!
//! Every validator returns its own `Vec<Diagnostic>`; the compile orchestrator
//! concatenates them so one run surfaces every defect at once.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Diagnostic severity. Only `Error` blocks plan emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warn,
    Info,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warn => "warn",
            Severity::Info => "info",
        }
    }
}

/// Stable diagnostic codes.
///
/// The serialized form (e.g. `E300_WRITE_OUTSIDE`) is part of the public
/// contract; severity is derived from its prefix letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Code {
    #[serde(rename = "E001_PARSE")]
    Parse,
    #[serde(rename = "E100_UNKNOWN_TARGET")]
    UnknownTarget,
    #[serde(rename = "E101_BAD_MANIFEST")]
    BadManifest,
    #[serde(rename = "E102_MISSING_MACRO")]
    MissingMacro,
    #[serde(rename = "E200_UNKNOWN_MACRO")]
    UnknownMacro,
    #[serde(rename = "E201_MISSING_MACRO_ARG")]
    MissingMacroArg,
    #[serde(rename = "E202_MACRO_ARG_TYPE")]
    MacroArgType,
    #[serde(rename = "E210_UNKNOWN_ENSURE")]
    UnknownEnsure,
    #[serde(rename = "E211_UNKNOWN_ACTION")]
    UnknownAction,
    #[serde(rename = "E220_WRITEFILE_NO_CONTENT")]
    WriteFileNoContent,
    #[serde(rename = "E300_WRITE_OUTSIDE")]
    WriteOutside,
    #[serde(rename = "E301_DENIED_PATH")]
    DeniedPath,
    #[serde(rename = "E302_SCOPE_VIOLATION")]
    ScopeViolation,
    #[serde(rename = "E310_CMD_NOT_ALLOWED")]
    CmdNotAllowed,
    #[serde(rename = "E311_CMD_DENIED_SUBSTRING")]
    CmdDeniedSubstring,
    #[serde(rename = "E320_EFFECTS_SCOPE_REQUIRED")]
    EffectsScopeRequired,
    #[serde(rename = "E321_BAD_WRITE_SCOPE")]
    BadWriteScope,
    #[serde(rename = "E400_STEP_NO_ENSURES")]
    StepNoEnsures,
    #[serde(rename = "E410_UNVERIFIED_ASSUMPTION")]
    UnverifiedAssumption,
    #[serde(rename = "E411_ASSUMPTION_NO_DECISION")]
    AssumptionNoDecision,
    #[serde(rename = "E412_ASSUMPTION_DECISION_NOT_FINAL")]
    AssumptionDecisionNotFinal,
    #[serde(rename = "E413_DECISION_DUPLICATE")]
    DecisionDuplicate,
    #[serde(rename = "E414_DECISION_PARENT_MISSING")]
    DecisionParentMissing,
    #[serde(rename = "E415_DECISION_CYCLE")]
    DecisionCycle,
    #[serde(rename = "E420_STEP_NO_CLAIMS")]
    StepNoClaims,
    #[serde(rename = "E421_UNKNOWN_CLAIM")]
    UnknownClaim,
    #[serde(rename = "E422_UNCLAIMED_INVARIANT")]
    UnclaimedInvariant,
    #[serde(rename = "E424_MISSING_INVARIANTS")]
    MissingInvariants,
    #[serde(rename = "E425_STEP_DECISION_MISSING")]
    StepDecisionMissing,
    #[serde(rename = "E426_STEP_DECISION_NOT_FINAL")]
    StepDecisionNotFinal,
    #[serde(rename = "W430_REQUIRES_ORDER")]
    RequiresOrder,
    #[serde(rename = "E460_ARTIFACT_NOT_WRITTEN")]
    ArtifactNotWritten,
}

impl Code {
    pub fn as_str(self) -> &'static str {
        match self {
            Code::Parse => "E001_PARSE",
            Code::UnknownTarget => "E100_UNKNOWN_TARGET",
            Code::BadManifest => "E101_BAD_MANIFEST",
            Code::MissingMacro => "E102_MISSING_MACRO",
            Code::UnknownMacro => "E200_UNKNOWN_MACRO",
            Code::MissingMacroArg => "E201_MISSING_MACRO_ARG",
            Code::MacroArgType => "E202_MACRO_ARG_TYPE",
            Code::UnknownEnsure => "E210_UNKNOWN_ENSURE",
            Code::UnknownAction => "E211_UNKNOWN_ACTION",
            Code::WriteFileNoContent => "E220_WRITEFILE_NO_CONTENT",
            Code::WriteOutside => "E300_WRITE_OUTSIDE",
            Code::DeniedPath => "E301_DENIED_PATH",
            Code::ScopeViolation => "E302_SCOPE_VIOLATION",
            Code::CmdNotAllowed => "E310_CMD_NOT_ALLOWED",
            Code::CmdDeniedSubstring => "E311_CMD_DENIED_SUBSTRING",
            Code::EffectsScopeRequired => "E320_EFFECTS_SCOPE_REQUIRED",
            Code::BadWriteScope => "E321_BAD_WRITE_SCOPE",
            Code::StepNoEnsures => "E400_STEP_NO_ENSURES",
            Code::UnverifiedAssumption => "E410_UNVERIFIED_ASSUMPTION",
            Code::AssumptionNoDecision => "E411_ASSUMPTION_NO_DECISION",
            Code::AssumptionDecisionNotFinal => "E412_ASSUMPTION_DECISION_NOT_FINAL",
            Code::DecisionDuplicate => "E413_DECISION_DUPLICATE",
            Code::DecisionParentMissing => "E414_DECISION_PARENT_MISSING",
            Code::DecisionCycle => "E415_DECISION_CYCLE",
            Code::StepNoClaims => "E420_STEP_NO_CLAIMS",
            Code::UnknownClaim => "E421_UNKNOWN_CLAIM",
            Code::UnclaimedInvariant => "E422_UNCLAIMED_INVARIANT",
            Code::MissingInvariants => "E424_MISSING_INVARIANTS",
            Code::StepDecisionMissing => "E425_STEP_DECISION_MISSING",
            Code::StepDecisionNotFinal => "E426_STEP_DECISION_NOT_FINAL",
            Code::RequiresOrder => "W430_REQUIRES_ORDER",
            Code::ArtifactNotWritten => "E460_ARTIFACT_NOT_WRITTEN",
        }
    }

    pub fn severity(self) -> Severity {
        match self.as_str().as_bytes().first() {
            Some(b'W') => Severity::Warn,
            Some(b'I') => Severity::Info,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: Code,
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl Diagnostic {
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        Self {
            code,
            severity: code.severity(),
            message: message.into(),
            hint: None,
            path: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.severity.as_str(), self.code)?;
        if let Some(path) = &self.path {
            write!(f, " {path}")?;
        }
        write!(f, ": {}", self.message)?;
        if let Some(hint) = &self.hint {
            write!(f, "\n  hint: {hint}")?;
        }
        Ok(())
    }
}

/// True if any diagnostic carries error severity.
pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_CODES: [Code; 32] = [
        Code::Parse,
        Code::UnknownTarget,
        Code::BadManifest,
        Code::MissingMacro,
        Code::UnknownMacro,
        Code::MissingMacroArg,
        Code::MacroArgType,
        Code::UnknownEnsure,
        Code::UnknownAction,
        Code::WriteFileNoContent,
        Code::WriteOutside,
        Code::DeniedPath,
        Code::ScopeViolation,
        Code::CmdNotAllowed,
        Code::CmdDeniedSubstring,
        Code::EffectsScopeRequired,
        Code::BadWriteScope,
        Code::StepNoEnsures,
        Code::UnverifiedAssumption,
        Code::AssumptionNoDecision,
        Code::AssumptionDecisionNotFinal,
        Code::DecisionDuplicate,
        Code::DecisionParentMissing,
        Code::DecisionCycle,
        Code::StepNoClaims,
        Code::UnknownClaim,
        Code::UnclaimedInvariant,
        Code::MissingInvariants,
        Code::StepDecisionMissing,
        Code::StepDecisionNotFinal,
        Code::RequiresOrder,
        Code::ArtifactNotWritten,
    ];

    /// Fails to compile when a variant is added without updating [`ALL_CODES`].
    fn listed(code: Code) -> bool {
        match code {
            Code::Parse
            | Code::UnknownTarget
            | Code::BadManifest
            | Code::MissingMacro
            | Code::UnknownMacro
            | Code::MissingMacroArg
            | Code::MacroArgType
            | Code::UnknownEnsure
            | Code::UnknownAction
            | Code::WriteFileNoContent
            | Code::WriteOutside
            | Code::DeniedPath
            | Code::ScopeViolation
            | Code::CmdNotAllowed
            | Code::CmdDeniedSubstring
            | Code::EffectsScopeRequired
            | Code::BadWriteScope
            | Code::StepNoEnsures
            | Code::UnverifiedAssumption
            | Code::AssumptionNoDecision
            | Code::AssumptionDecisionNotFinal
            | Code::DecisionDuplicate
            | Code::DecisionParentMissing
            | Code::DecisionCycle
            | Code::StepNoClaims
            | Code::UnknownClaim
            | Code::UnclaimedInvariant
            | Code::MissingInvariants
            | Code::StepDecisionMissing
            | Code::StepDecisionNotFinal
            | Code::RequiresOrder
            | Code::ArtifactNotWritten => ALL_CODES.contains(&code),
        }
    }

    #[test]
    fn as_str_matches_serialized_name_for_every_code() {
        let mut seen = std::collections::HashSet::new();
        for code in ALL_CODES {
            assert!(listed(code));
            assert_eq!(
                serde_json::to_value(code).expect("serialize"),
                serde_json::Value::String(code.as_str().to_string()),
                "{code:?}"
            );
            let back: Code = serde_json::from_value(serde_json::json!(code.as_str())).expect("decode");
            assert_eq!(back, code);
            assert!(seen.insert(code.as_str()), "duplicate code string {}", code.as_str());
        }
    }

    #[test]
    fn severity_follows_code_prefix() {
        assert_eq!(Code::WriteOutside.severity(), Severity::Error);
        assert_eq!(Code::RequiresOrder.severity(), Severity::Warn);
    }

    #[test]
    fn serializes_stable_code_strings() {
        let diag = Diagnostic::new(Code::UnknownClaim, "step 'a' claims 'X'").with_path("steps[0]");
        let json = serde_json::to_value(&diag).expect("serialize");
        assert_eq!(json["code"], "E421_UNKNOWN_CLAIM");
        assert_eq!(json["severity"], "error");
        assert_eq!(json["path"], "steps[0]");
        assert!(json.get("hint").is_none());
    }

    #[test]
    fn display_includes_path_and_hint() {
        let diag = Diagnostic::new(Code::StepNoEnsures, "step 'build' has ops but no checks")
            .with_path("steps[2]")
            .with_hint("add at least one `ensures` entry");
        assert_eq!(
            diag.to_string(),
            "error[E400_STEP_NO_ENSURES] steps[2]: step 'build' has ops but no checks\n  hint: add at least one `ensures` entry"
        );
    }
}
