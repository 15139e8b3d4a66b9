// Error handling utilities for consistent error messages and exit codes

use std::process;

/// Exit with a user error (exit code 1)
/// User errors are for invalid input, missing resources, etc.
pub fn user_error(message: &str) -> ! {
    eprintln!("Error: {}", message);
    process::exit(1);
}

/// Validate that a build ID is valid (positive integer)
pub fn validate_build_id(id_str: &str) -> Result<i64, String> {
    id_str.parse::<i64>()
        .map_err(|_| format!("Invalid build ID: '{}'. Build ID must be a number.", id_str))
        .and_then(|id| {
            if id > 0 {
                Ok(id)
            } else {
                Err(format!("Invalid build ID: {}. Build ID must be positive.", id))
            }
        })
}

/// Validate a history depth (positive integer)
pub fn validate_depth(depth_str: &str) -> Result<usize, String> {
    match depth_str.parse::<usize>() {
        Ok(depth) if depth > 0 => Ok(depth),
        _ => Err(format!("Invalid depth: '{}'. Depth must be a positive number.", depth_str)),
    }
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '.' || c == '_' || c == '-' || c == '/'
}

/// Validate task name format (alphanumeric, dots, underscores, hyphens, slashes)
pub fn validate_task_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("Task name cannot be empty".to_string());
    }

    if name.chars().all(is_name_char) {
        Ok(())
    } else {
        Err(format!("Invalid task name: '{}'. Task names can only contain letters, numbers, dots, underscores, hyphens, and slashes.", name))
    }
}

/// Validate stage name format (same charset as task names)
pub fn validate_stage_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("Stage name cannot be empty".to_string());
    }

    if name.chars().all(is_name_char) {
        Ok(())
    } else {
        Err(format!("Invalid stage name: '{}'. Stage names can only contain letters, numbers, dots, underscores, hyphens, and slashes.", name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_build_id() {
        assert_eq!(validate_build_id("1"), Ok(1));
        assert_eq!(validate_build_id("42"), Ok(42));
        assert!(validate_build_id("0").is_err());
        assert!(validate_build_id("-1").is_err());
        assert!(validate_build_id("abc").is_err());
        assert!(validate_build_id("").is_err());
    }

    #[test]
    fn test_validate_depth() {
        assert_eq!(validate_depth("5"), Ok(5));
        assert!(validate_depth("0").is_err());
        assert!(validate_depth("-3").is_err());
        assert!(validate_depth("lots").is_err());
    }

    #[test]
    fn test_validate_task_name() {
        assert!(validate_task_name("unit").is_ok());
        assert!(validate_task_name("linux/unit-tests_2.1").is_ok());
        assert!(validate_task_name("").is_err());
        assert!(validate_task_name("   ").is_err());
        assert!(validate_task_name("unit tests").is_err());
        assert!(validate_task_name("unit=failed").is_err());
    }

    #[test]
    fn test_validate_stage_name() {
        assert!(validate_stage_name("devicelab").is_ok());
        assert!(validate_stage_name("").is_err());
        assert!(validate_stage_name("dev:lab").is_err());
    }
}
