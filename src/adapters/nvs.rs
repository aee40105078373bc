//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements both [`ConfigPort`] and [`StoragePort`] for the CliniPower
//! controller, and loads the model blob written by the provisioning tool.
//!
//! - Config validation: all fields are range-checked before persistence
//!   and again after loading.
//! - Namespace isolation: config and model live in separate namespaces.
//! - Atomic writes: ESP-IDF NVS commits are atomic per nvs_commit().

use log::info;

use crate::app::ports::{ConfigError, ConfigPort, StorageError, StoragePort};
use crate::config::SystemConfig;

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

const CONFIG_NAMESPACE: &str = "clinipower";
const CONFIG_KEY: &str = "syscfg";

/// Namespace and key of the int8 dense model blob.
pub const MODEL_NAMESPACE: &str = "model";
pub const MODEL_KEY: &str = "dense";

/// Largest blob accepted from flash (NVS blobs span at most ~500 KiB; the
/// classifier is a few KiB).
const MAX_BLOB_SIZE: usize = 64 * 1024;

/// NVS keys and namespaces are at most 15 bytes plus the terminator.
#[cfg(target_os = "espidf")]
fn nvs_name(name: &str) -> [u8; 16] {
    let mut buf = [0u8; 16];
    let bytes = name.as_bytes();
    let len = bytes.len().min(15);
    buf[..len].copy_from_slice(&bytes[..len]);
    buf
}

pub struct NvsAdapter {
    #[cfg(not(target_os = "espidf"))]
    store: std::cell::RefCell<HashMap<String, Vec<u8>>>,
}

impl NvsAdapter {
    /// Create a new NvsAdapter and initialise NVS flash.
    ///
    /// On first boot or after a version mismatch the NVS partition is
    /// erased and re-initialised automatically.
    pub fn new() -> Result<Self, StorageError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: nvs_flash_init / nvs_flash_erase are called from the
            // single main-task context before any concurrent NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
                log::warn!("NVS: erasing and re-initialising flash partition");
                if unsafe { nvs_flash_erase() } != ESP_OK || unsafe { nvs_flash_init() } != ESP_OK {
                    return Err(StorageError::IoError);
                }
            } else if ret != ESP_OK {
                return Err(StorageError::IoError);
            }
            info!("NvsAdapter: ESP-IDF NVS initialised");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NvsAdapter: simulation backend");

        Ok(Self {
            #[cfg(not(target_os = "espidf"))]
            store: std::cell::RefCell::new(HashMap::new()),
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn composite_key(namespace: &str, key: &str) -> String {
        format!("{}::{}", namespace, key)
    }

    /// Open an NVS namespace, execute a closure with the handle, then close.
    #[cfg(target_os = "espidf")]
    fn with_nvs_handle<F, T>(namespace: &str, write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let ns = nvs_name(namespace);
        let mut handle: nvs_handle_t = 0;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };

        esp_result(unsafe { nvs_open(ns.as_ptr().cast(), mode, &mut handle) })?;

        let result = f(handle);
        unsafe {
            nvs_close(handle);
        }
        result
    }
}

#[cfg(target_os = "espidf")]
fn esp_result(ret: esp_err_t) -> Result<(), esp_err_t> {
    if ret == ESP_OK { Ok(()) } else { Err(ret) }
}

/// Model blob written by the provisioning tool.
pub fn load_model_blob<S: StoragePort>(storage: &S) -> Result<Vec<u8>, StorageError> {
    let bytes = storage.read(MODEL_NAMESPACE, MODEL_KEY)?;
    info!("NvsAdapter: model blob {} bytes", bytes.len());
    Ok(bytes)
}

fn validate_config(cfg: &SystemConfig) -> Result<(), ConfigError> {
    cfg.validate().map_err(ConfigError::ValidationFailed)
}

impl StoragePort for NvsAdapter {
    fn read(&self, namespace: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            self.store
                .borrow()
                .get(&Self::composite_key(namespace, key))
                .cloned()
                .ok_or(StorageError::NotFound)
        }

        #[cfg(target_os = "espidf")]
        {
            let key_buf = nvs_name(key);
            let key_ptr = key_buf.as_ptr().cast();
            let result = Self::with_nvs_handle(namespace, false, |handle| {
                let mut size: usize = 0;
                // Query the size first, then read.
                esp_result(unsafe {
                    nvs_get_blob(handle, key_ptr, core::ptr::null_mut(), &mut size)
                })?;
                if size == 0 || size > MAX_BLOB_SIZE {
                    return Err(ESP_ERR_NVS_INVALID_LENGTH);
                }
                let mut buf = vec![0u8; size];
                esp_result(unsafe {
                    nvs_get_blob(handle, key_ptr, buf.as_mut_ptr().cast(), &mut size)
                })?;
                buf.truncate(size);
                Ok(buf)
            });
            match result {
                Ok(bytes) => Ok(bytes),
                Err(e) if e == ESP_ERR_NVS_NOT_FOUND => Err(StorageError::NotFound),
                Err(e) => {
                    log::warn!("NvsAdapter: read {}::{} failed ({})", namespace, key, e);
                    Err(StorageError::IoError)
                }
            }
        }
    }

    fn write(&self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        if data.len() > MAX_BLOB_SIZE {
            return Err(StorageError::Full);
        }

        #[cfg(not(target_os = "espidf"))]
        {
            self.store
                .borrow_mut()
                .insert(Self::composite_key(namespace, key), data.to_vec());
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let key_buf = nvs_name(key);
            Self::with_nvs_handle(namespace, true, |handle| {
                esp_result(unsafe {
                    nvs_set_blob(handle, key_buf.as_ptr().cast(), data.as_ptr().cast(), data.len())
                })?;
                esp_result(unsafe { nvs_commit(handle) })
            })
            .map_err(|e| {
                log::warn!("NvsAdapter: write {}::{} failed ({})", namespace, key, e);
                if e == ESP_ERR_NVS_NOT_ENOUGH_SPACE {
                    StorageError::Full
                } else {
                    StorageError::IoError
                }
            })
        }
    }
}

impl ConfigPort for NvsAdapter {
    fn load(&self) -> Result<SystemConfig, ConfigError> {
        let bytes = match self.read(CONFIG_NAMESPACE, CONFIG_KEY) {
            Ok(bytes) => bytes,
            Err(StorageError::NotFound) => {
                info!("NvsAdapter: no stored config, using defaults");
                return Ok(SystemConfig::default());
            }
            Err(_) => return Err(ConfigError::IoError),
        };
        let cfg: SystemConfig = postcard::from_bytes(&bytes).map_err(|_| ConfigError::Corrupted)?;
        validate_config(&cfg)?;
        info!("NvsAdapter: loaded config ({} bytes)", bytes.len());
        Ok(cfg)
    }

    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError> {
        validate_config(config)?;
        let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;
        self.write(CONFIG_NAMESPACE, CONFIG_KEY, &bytes)
            .map_err(|_| ConfigError::IoError)?;
        info!("NvsAdapter: config saved ({} bytes)", bytes.len());
        Ok(())
    }
}
