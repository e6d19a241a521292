//! Client configuration.
//!
//! Game options arrive as deployment parameters in the query string of the URL
//! the client was loaded from. The page URL (without its query) is the default
//! instance identifier, so every page hosting a board gets its own key.

use std::env;

pub const STORAGE_KEY_PREFIX: &str = "tictactoe_game_";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub const ZERO: Vector3 = Vector3::new(0.0, 0.0, 0.0);
    pub const ONE: Vector3 = Vector3::new(1.0, 1.0, 1.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Vector3 { x, y, z }
    }

    /// Parses `"x y z"`. Anything missing or unparsable yields `default`.
    pub fn parse_or(value: Option<&str>, default: Vector3) -> Vector3 {
        let Some(value) = value else {
            return default;
        };
        let parts: Result<Vec<f32>, _> = value.split_whitespace().map(str::parse::<f32>).collect();
        match parts.as_deref() {
            Ok([x, y, z, ..]) => Vector3::new(*x, *y, *z),
            _ => default,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vector3,
    pub rotation: Vector3,
    pub scale: Vector3,
}

impl Transform {
    pub const fn at(position: Vector3) -> Self {
        Transform {
            position,
            rotation: Vector3::ZERO,
            scale: Vector3::ONE,
        }
    }
}

/// Options the core carries for the renderer without interpreting them.
#[derive(Debug, Clone, PartialEq)]
pub struct RendererOptions {
    pub board: Transform,
    pub reset: Transform,
    pub custom_model: bool,
    pub lighting: Option<String>,
}

impl Default for RendererOptions {
    fn default() -> Self {
        RendererOptions {
            board: Transform::at(Vector3::new(0.0, 1.2, 0.0)),
            reset: Transform::at(Vector3::new(0.0, -0.4, 0.0)),
            custom_model: false,
            lighting: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameConfig {
    pub instance: String,
    pub hide_ui: bool,
    pub renderer: RendererOptions,
}

impl GameConfig {
    /// Defaults for a board hosted on `page_url`.
    pub fn for_page(page_url: &str) -> Self {
        GameConfig {
            instance: base_url(page_url).to_string(),
            hide_ui: false,
            renderer: RendererOptions::default(),
        }
    }

    /// Defaults for `page_url`, overridden by the query string of
    /// `script_url` when there is one.
    pub fn from_urls(page_url: &str, script_url: Option<&str>) -> Self {
        let mut config = GameConfig::for_page(page_url);
        if let Some(query) = script_url.and_then(query_of) {
            config.apply_query(query);
        }
        config
    }

    pub fn apply_query(&mut self, query: &str) {
        let params = parse_query(query);

        if let Some(hide_ui) = get_param(&params, "hideUI") {
            self.hide_ui = hide_ui == "true";
        }
        if let Some(instance) = get_param(&params, "instance") {
            self.instance = instance.to_string();
        }

        let r = &mut self.renderer;
        r.board.scale = Vector3::parse_or(get_param(&params, "boardScale"), r.board.scale);
        r.board.position = Vector3::parse_or(get_param(&params, "boardPosition"), r.board.position);
        r.board.rotation = Vector3::parse_or(get_param(&params, "boardRotation"), r.board.rotation);
        r.reset.scale = Vector3::parse_or(get_param(&params, "resetScale"), r.reset.scale);
        r.reset.position = Vector3::parse_or(get_param(&params, "resetPosition"), r.reset.position);
        r.reset.rotation = Vector3::parse_or(get_param(&params, "resetRotation"), r.reset.rotation);

        if let Some(custom_model) = get_param(&params, "customModel") {
            r.custom_model = custom_model == "true";
        }
        if let Some(lighting) = get_param(&params, "lighting") {
            r.lighting = Some(lighting.to_string());
        }
    }

    pub fn storage_key(&self) -> String {
        format!("{}{}", STORAGE_KEY_PREFIX, self.instance)
    }
}

/// Settings the headless client binary reads from its environment.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub store_url: String,
    pub space: String,
    pub game: GameConfig,
}

impl ClientSettings {
    pub fn from_env() -> Self {
        let store_url = env::var("TICTACTOE_STORE_URL")
            .unwrap_or_else(|_| "ws://127.0.0.1:3000/ws".to_string());
        let space = env::var("TICTACTOE_SPACE").unwrap_or_else(|_| "lobby".to_string());
        let page_url =
            env::var("TICTACTOE_PAGE_URL").unwrap_or_else(|_| "https://localhost/".to_string());
        let script_url = env::var("TICTACTOE_SCRIPT_URL").ok();

        ClientSettings {
            store_url,
            space,
            game: GameConfig::from_urls(&page_url, script_url.as_deref()),
        }
    }
}

/// Everything before the first `?`.
pub fn base_url(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

fn query_of(url: &str) -> Option<&str> {
    let (_, rest) = url.split_once('?')?;
    Some(rest.split('#').next().unwrap_or(rest))
}

fn parse_query(query: &str) -> Vec<(String, String)> {
    let query = query.strip_prefix('?').unwrap_or(query);
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (percent_decode(key), percent_decode(value))
        })
        .collect()
}

fn get_param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' if i + 2 < bytes.len() => {
                let hex = &bytes[i + 1..i + 3];
                let decoded = std::str::from_utf8(hex)
                    .ok()
                    .filter(|_| hex.iter().all(u8::is_ascii_hexdigit))
                    .and_then(|h| u8::from_str_radix(h, 16).ok());
                match decoded {
                    Some(byte) => {
                        out.push(byte);
                        i += 3;
                        continue;
                    }
                    None => out.push(b'%'),
                }
            }
            b => out.push(b),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
