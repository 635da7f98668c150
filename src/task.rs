//! Predefined generation tasks, their prompts and fallbacks

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::request::{Origin, Output};
use crate::schema::{FieldSpec, Schema};

/// The three generation capabilities the builder exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind
{   /// Component source plus explanation for the live preview
    AppCode
  , /// Flutter theme source
    Theme
  , /// Advice on sharpening the user's description
    Suggestions
}

impl TaskKind
{   pub const ALL: [TaskKind; 3]
      = [TaskKind::AppCode, TaskKind::Theme, TaskKind::Suggestions];

    pub fn id(&self) -> &'static str
    {   match self
        {   TaskKind::AppCode => "generateAppFromDescription"
          , TaskKind::Theme => "generateThemeFromDescription"
          , TaskKind::Suggestions => "suggestImprovementsToDescription"
        }
    }
}

/// A named unit of work, fixed at startup
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationTask
{   pub kind: TaskKind
  , pub task_id: String
  , pub prompt_template: String
  , pub input_schema: Schema
  , pub output_schema: Schema
  , pub model_hint: Option<String>
  , fallback: BTreeMap<String, String>
}

impl GenerationTask
{   /// Substitute `{{{field}}}` placeholders with input values
    pub fn render_prompt(
      &self
    , input: &BTreeMap<String, String>
    ) -> String
    {   let mut out = String::with_capacity(self.prompt_template.len());
        let mut rest = self.prompt_template.as_str();
        while let Some(start) = rest.find("{{{")
        {   out.push_str(&rest[..start]);
            let after = &rest[start + 3..];
            match after.find("}}}")
            {   Some(end) => {
                  let name = after[..end].trim();
                  match input.get(name)
                  {   Some(value) => out.push_str(value)
                    , None => out.push_str(&rest[start..start + 3 + end + 3])
                  }
                  rest = &after[end + 3..];
                }
              , None => {
                  out.push_str(&rest[start..]);
                  rest = "";
                }
            }
        }
        out.push_str(rest);
        out
    }

    /// Names referenced by the prompt template
    pub fn placeholders(&self) -> Vec<String>
    {   let mut names = Vec::new();
        let mut rest = self.prompt_template.as_str();
        while let Some(start) = rest.find("{{{")
        {   let after = &rest[start + 3..];
            match after.find("}}}")
            {   Some(end) => {
                  names.push(after[..end].trim().to_string());
                  rest = &after[end + 3..];
                }
              , None => break
            }
        }
        names
    }

    /// The always-valid degraded output for this task
    pub fn fallback(&self) -> Output
    {   Output::new(self.fallback.clone(), Origin::Fallback)
    }
}

/// All tasks known to the orchestrator
#[derive(Debug, Clone)]
pub struct TaskCatalog
{   tasks: BTreeMap<TaskKind, GenerationTask>
}

impl TaskCatalog
{   pub fn builtin() -> Self
    {   let tasks = TaskKind::ALL.iter()
          .map(|kind| (*kind, builtin_task(*kind)))
          .collect();
        TaskCatalog { tasks }
    }

    /// Replace the model hint for every task
    pub fn with_model_hint(mut self, model: &str) -> Self
    {   for task in self.tasks.values_mut()
        {   task.model_hint = Some(model.to_string());
        }
        self
    }

    pub fn get(&self, kind: TaskKind) -> &GenerationTask
    {   // builtin() populates every kind
        &self.tasks[&kind]
    }

    pub fn iter(&self) -> impl Iterator<Item = &GenerationTask>
    {   self.tasks.values()
    }
}

impl Default for TaskCatalog
{   fn default() -> Self
    {   TaskCatalog::builtin()
    }
}

fn description_input(description: &str) -> Schema
{   Schema::new(vec![FieldSpec::new("description", description)])
}

fn builtin_task(kind: TaskKind) -> GenerationTask
{   match kind
    {   TaskKind::AppCode => GenerationTask
        {   kind
          , task_id: kind.id().to_string()
          , prompt_template: APP_CODE_PROMPT.to_string()
          , input_schema: description_input(
              "A detailed description of the desired app."
            )
          , output_schema: Schema::new(vec![
              FieldSpec::new(
                "componentCode",
                "Component markup using only the allowed primitives."
              )
            , FieldSpec::new(
                "explanation",
                "A short explanation of the generated screen."
              ).allow_empty()
            ])
          , model_hint: None
          , fallback: BTreeMap::from([
              ("componentCode".to_string(), APP_CODE_FALLBACK.to_string())
            , ("explanation".to_string(), APP_CODE_FALLBACK_EXPLANATION.to_string())
            ])
        }
      , TaskKind::Theme => GenerationTask
        {   kind
          , task_id: kind.id().to_string()
          , prompt_template: THEME_PROMPT.to_string()
          , input_schema: description_input(
              "A description of the desired look and feel."
            )
          , output_schema: Schema::new(vec![
              FieldSpec::new("themeCode", "The generated Flutter theme code.")
            ])
          , model_hint: None
          , fallback: BTreeMap::from([
              ("themeCode".to_string(), THEME_FALLBACK.to_string())
            ])
        }
      , TaskKind::Suggestions => GenerationTask
        {   kind
          , task_id: kind.id().to_string()
          , prompt_template: SUGGESTIONS_PROMPT.to_string()
          , input_schema: description_input(
              "The text description of the desired app."
            )
          , output_schema: Schema::new(vec![
              FieldSpec::new(
                "suggestions",
                "Suggestions for improving the app description."
              )
            ])
          , model_hint: None
          , fallback: BTreeMap::from([
              ("suggestions".to_string(), SUGGESTIONS_FALLBACK.to_string())
            ])
        }
    }
}

const APP_CODE_PROMPT: &str = "\
You are an expert UI developer who builds mobile app screens from a user's description.

Write the screen as JSX-like markup. Rules:
- Output only a `return ( ... );` statement, optionally preceded by
  `const name = useState(\"value\");` lines.
- Use only these components: View, Card, Button, Input, Label, Avatar,
  Progress, Badge, Text, Image, Skeleton, div, span, p, h1, h2, h3, ul, li,
  and icons such as Home, User, Settings, Search, Mail, Lock, Bell, Heart,
  Star, Menu, Plus, Check, ChevronRight, ShoppingCart, Calendar.
- Attribute values are string literals or `{name}` references to consts.
- No imports, arrow functions, event handlers or network calls.

Also return a one-paragraph explanation of the screen.

Description: {{{description}}}
";

const THEME_PROMPT: &str = "\
You are an expert Flutter developer. Generate a complete Flutter ThemeData
definition (colors, typography, component themes) that matches the
following description.

Description: {{{description}}}

Generate the Flutter theme code:
";

const SUGGESTIONS_PROMPT: &str = "\
You are an AI assistant that helps users refine their app descriptions to generate better app code. Given the user's description, provide specific and actionable suggestions on how to improve it. Focus on clarity, detail, and completeness. Suggest adding details about the app's purpose, target audience, key features, and any specific UI elements or functionalities.

User's Description: {{{description}}}

Improvements:
";

pub const APP_CODE_FALLBACK: &str = "\
return (
  <Card className=\"generation-failed\">
    <AlertTriangle />
    <Label>Generation failed</Label>
    <Text>We could not generate this screen right now. Please try again.</Text>
    <Button variant=\"outline\">Retry</Button>
  </Card>
);";

const APP_CODE_FALLBACK_EXPLANATION: &str = "\
The AI service did not return a usable screen after several attempts, so a \
placeholder is shown instead. Please retry in a moment.";

const THEME_FALLBACK: &str = "\
import 'package:flutter/material.dart';

// Generation failed; default Material 3 theme.
final ThemeData appTheme = ThemeData(
  useMaterial3: true,
  colorScheme: ColorScheme.fromSeed(seedColor: Colors.indigo),
);
";

const SUGGESTIONS_FALLBACK: &str = "\
Suggestions are unavailable right now. Meanwhile, try describing the app's \
purpose, its target audience, the key screens and features, and any specific \
UI elements you want to see.";
