// SPDX-License-Identifier: MIT OR Apache-2.0
//! Timeline scripts stored as RON.
//!
//! A script carries timeline settings and an ordered list of steps. It is
//! validated when loaded, then replayed onto a [`Timeline`] with
//! [`Script::build`].

use serde::{Deserialize, Serialize};
use stagehand_timeline::{
    Animator, ConfigError, Easing, GroupBuilder, PropertySet, Timeline, TimelineConfig, Timing,
};
use std::path::Path;
use thiserror::Error;

/// Current script format version
pub const SCRIPT_FORMAT_VERSION: u32 = 1;

/// Script errors
#[derive(Debug, Error)]
pub enum ScriptError {
    /// Reading or parsing failed
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Script was written by a newer version
    #[error("Script version {found} is newer than supported version {supported}")]
    UnsupportedVersion {
        /// Version found in the script
        found: u32,
        /// Newest supported version
        supported: u32,
    },

    /// A step kind that cannot appear inside a parallel group
    #[error("{0} is not allowed inside Parallel")]
    NotAllowedInGroup(&'static str),
}

/// One scripted step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScriptStep {
    /// Animate to properties
    To {
        /// Target name
        target: String,
        /// Properties to apply
        properties: PropertySet,
        /// Duration in milliseconds
        duration: i64,
        /// Delay in milliseconds
        #[serde(default)]
        delay: i64,
        /// Easing token
        #[serde(default)]
        easing: Option<Easing>,
    },
    /// Seed properties now, animate back to natural values
    From {
        /// Target name
        target: String,
        /// Properties to seed
        properties: PropertySet,
        /// Duration in milliseconds
        duration: i64,
        /// Delay in milliseconds
        #[serde(default)]
        delay: i64,
        /// Easing token
        #[serde(default)]
        easing: Option<Easing>,
    },
    /// Seed `from` now, animate to `to`
    FromTo {
        /// Target name
        target: String,
        /// Properties to seed
        from: PropertySet,
        /// Properties to apply
        to: PropertySet,
        /// Duration in milliseconds
        duration: i64,
        /// Delay in milliseconds
        #[serde(default)]
        delay: i64,
        /// Easing token
        #[serde(default)]
        easing: Option<Easing>,
    },
    /// Consume time
    Wait(i64),
    /// Name the next position
    Label(String),
    /// Members start together
    Parallel(Vec<ScriptStep>),
    /// Reverse the sequential steps declared so far
    Reverse,
}

fn timing(duration: i64, delay: i64, easing: &Option<Easing>) -> Timing {
    let timing = Timing::ms(duration).delay(delay);
    match easing {
        Some(easing) => timing.easing(easing.clone()),
        None => timing,
    }
}

/// A timeline script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    /// Format version
    #[serde(default = "default_version")]
    pub version: u32,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Timeline settings
    #[serde(default)]
    pub timeline: TimelineConfig,
    /// Passes to play before stopping a repeating timeline
    #[serde(default = "default_passes")]
    pub passes: u32,
    /// Steps in declaration order
    pub steps: Vec<ScriptStep>,
}

fn default_version() -> u32 {
    SCRIPT_FORMAT_VERSION
}

fn default_passes() -> u32 {
    1
}

impl Script {
    /// Parse and validate a script from RON text
    pub fn from_ron(text: &str) -> Result<Self, ScriptError> {
        let script: Script = ron::from_str(text).map_err(ConfigError::from)?;
        script.validate()?;
        Ok(script)
    }

    /// Load and validate a script file
    pub fn load(path: &Path) -> Result<Self, ScriptError> {
        let text = std::fs::read_to_string(path).map_err(ConfigError::from)?;
        let script = Self::from_ron(&text)?;
        tracing::debug!(path = %path.display(), steps = script.steps.len(), "loaded script");
        Ok(script)
    }

    fn validate(&self) -> Result<(), ScriptError> {
        if self.version > SCRIPT_FORMAT_VERSION {
            return Err(ScriptError::UnsupportedVersion {
                found: self.version,
                supported: SCRIPT_FORMAT_VERSION,
            });
        }

        for step in &self.steps {
            let ScriptStep::Parallel(members) = step else {
                continue;
            };
            for member in members {
                match member {
                    ScriptStep::Label(_) => return Err(ScriptError::NotAllowedInGroup("Label")),
                    ScriptStep::Parallel(_) => {
                        return Err(ScriptError::NotAllowedInGroup("Parallel"))
                    }
                    ScriptStep::Reverse => return Err(ScriptError::NotAllowedInGroup("Reverse")),
                    _ => {}
                }
            }
        }
        Ok(())
    }

    /// Append the script's steps to `timeline`
    pub fn build<A>(&self, timeline: &Timeline<A>)
    where
        A: Animator,
        A::Target: From<String>,
    {
        for step in &self.steps {
            match step {
                ScriptStep::To {
                    target,
                    properties,
                    duration,
                    delay,
                    easing,
                } => {
                    let timing = timing(*duration, *delay, easing);
                    timeline.to(target.clone(), properties.clone(), timing);
                }
                ScriptStep::From {
                    target,
                    properties,
                    duration,
                    delay,
                    easing,
                } => {
                    let timing = timing(*duration, *delay, easing);
                    timeline.from(target.clone(), properties.clone(), timing);
                }
                ScriptStep::FromTo {
                    target,
                    from,
                    to,
                    duration,
                    delay,
                    easing,
                } => {
                    let timing = timing(*duration, *delay, easing);
                    timeline.from_to(target.clone(), from.clone(), to.clone(), timing);
                }
                ScriptStep::Wait(ms) => {
                    timeline.wait(*ms);
                }
                ScriptStep::Label(name) => {
                    timeline.add_label(name.clone());
                }
                ScriptStep::Reverse => {
                    timeline.reverse();
                }
                ScriptStep::Parallel(members) => {
                    timeline.parallel(|group| {
                        for member in members {
                            add_member(group, member);
                        }
                    });
                }
            }
        }
    }
}

fn add_member<A>(group: &mut GroupBuilder<'_, A>, member: &ScriptStep)
where
    A: Animator,
    A::Target: From<String>,
{
    match member {
        ScriptStep::To {
            target,
            properties,
            duration,
            delay,
            easing,
        } => {
            let timing = timing(*duration, *delay, easing);
            group.to(target.clone(), properties.clone(), timing);
        }
        ScriptStep::From {
            target,
            properties,
            duration,
            delay,
            easing,
        } => {
            let timing = timing(*duration, *delay, easing);
            group.from(target.clone(), properties.clone(), timing);
        }
        ScriptStep::FromTo {
            target,
            from,
            to,
            duration,
            delay,
            easing,
        } => {
            let timing = timing(*duration, *delay, easing);
            group.from_to(target.clone(), from.clone(), to.clone(), timing);
        }
        ScriptStep::Wait(ms) => {
            group.wait(*ms);
        }
        // Rejected by validate
        ScriptStep::Label(_) | ScriptStep::Parallel(_) | ScriptStep::Reverse => {}
    }
}
