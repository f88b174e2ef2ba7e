use serde::Serialize;
use vlan_topology::{Config, Intent, Outcome, TopologyEditor, TopologyError};
use wasm_bindgen::prelude::*;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApplyResult {
    outcome: Outcome,
    view: vlan_topology::TopologyView,
}

fn parse_config(config_json: Option<String>) -> Result<Config, String> {
    match config_json {
        Some(raw) => vlan_topology::config::parse_config(&raw).map_err(|error| format!("{error:#}")),
        None => Ok(Config::default()),
    }
}

fn apply_json(editor: &mut TopologyEditor, intent_json: &str) -> Result<String, String> {
    let intent: Intent = serde_json::from_str(intent_json).map_err(|error| error.to_string())?;
    let outcome = editor
        .apply(&intent)
        .map_err(|error: TopologyError| error.to_string())?;
    let result = ApplyResult {
        outcome,
        view: editor.view(),
    };
    serde_json::to_string(&result).map_err(|error| error.to_string())
}

/// Editing session held by the browser. Every call takes and returns JSON.
#[wasm_bindgen]
pub struct TopologySession {
    editor: TopologyEditor,
}

#[wasm_bindgen]
impl TopologySession {
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<TopologySession, JsValue> {
        let config = parse_config(config_json).map_err(|error| JsValue::from_str(&error))?;
        Ok(TopologySession {
            editor: TopologyEditor::new(config),
        })
    }

    /// Applies one intent, e.g. `{"op":"addCable","source":"sw-1",...}`, and
    /// returns `{outcome, view}`.
    pub fn apply(&mut self, intent_json: &str) -> Result<String, JsValue> {
        apply_json(&mut self.editor, intent_json).map_err(|error| JsValue::from_str(&error))
    }

    pub fn view(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.editor.view())
            .map_err(|error| JsValue::from_str(&error.to_string()))
    }

    #[wasm_bindgen(js_name = canUndo)]
    pub fn can_undo(&self) -> bool {
        self.editor.can_undo()
    }

    #[wasm_bindgen(js_name = canRedo)]
    pub fn can_redo(&self) -> bool {
        self.editor.can_redo()
    }
}
