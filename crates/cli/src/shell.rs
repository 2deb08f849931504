//! Interactive command loop and command file playback
//!
//! One line per command: the first token selects the command, the rest are
//! arguments (`escribir` takes the remainder of the line as content).
//! Output goes to stdout, errors to stderr; the process exit status is
//! always zero.

use anyhow::Result;
use celv_core::{listing_order, File, FileKind, FileSystem};
use owo_colors::OwoColorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::io::BufRead;
use std::path::Path;

pub struct Shell {
    fs: FileSystem,
    running: bool,
}

impl Shell {
    pub fn new() -> Self {
        Self {
            fs: FileSystem::new(),
            running: false,
        }
    }

    /// Read commands from the terminal until `salir` or end of input
    pub fn run_interactive(&mut self) -> Result<()> {
        println!("Consola CELV iniciada!");
        println!("Escribe `ayuda` para la lista de comandos disponibles");
        println!("Escribe `salir` para terminar esta sesión. Recuerda que los cambios serán descartados al salir");

        let mut editor = DefaultEditor::new()?;
        self.running = true;
        while self.running {
            match editor.readline(&self.prompt()) {
                Ok(line) => {
                    let _ = editor.add_history_entry(line.as_str());
                    self.execute(&line);
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(err) => {
                    eprintln!("{}", err.to_string().red());
                    break;
                }
            }
        }
        Ok(())
    }

    /// Play back a command file until end of file or `salir`
    pub fn run_script(&mut self, path: &Path) -> Result<()> {
        let file = match std::fs::File::open(path) {
            Ok(file) => file,
            Err(_) => {
                eprintln!(
                    "{}",
                    format!("File '{}' does not exist", path.display()).red()
                );
                return Ok(());
            }
        };

        self.running = true;
        for line in std::io::BufReader::new(file).lines() {
            if !self.running {
                break;
            }
            match line {
                Ok(line) => self.execute(&line),
                Err(err) => {
                    eprintln!("{}", err.to_string().red());
                    break;
                }
            }
        }
        Ok(())
    }

    fn prompt(&self) -> String {
        format!("AELV [{}] >> ", self.fs.current_dir_name())
    }

    /// Dispatch a single command line
    pub fn execute(&mut self, line: &str) {
        let Some((command, rest)) = split_token(line) else {
            return; // blank line
        };

        match command {
            "ayuda" => self.help(),
            "salir" => {
                println!("Saliendo del interpretador");
                self.running = false;
            }
            "ls" => self.list(),
            "ir" => {
                let result = match split_token(rest) {
                    Some((name, _)) => self.fs.change_directory(name),
                    None => self.fs.change_directory_up(),
                };
                self.report(result);
            }
            "crear_dir" => self.with_name(command, rest, |shell, name| {
                let result = shell.fs.create_file(name, FileKind::Directory);
                shell.report(result);
            }),
            "crear_archivo" => self.with_name(command, rest, |shell, name| {
                let result = shell.fs.create_file(name, FileKind::Document);
                shell.report(result);
            }),
            "eliminar" => self.with_name(command, rest, |shell, name| {
                let result = shell.fs.remove_file(name);
                shell.report(result);
            }),
            "leer" => self.with_name(command, rest, |shell, name| match shell.fs.read_file(name) {
                Ok(content) => println!("{}", content),
                Err(err) => eprintln!("{}", err.to_string().red()),
            }),
            "escribir" => match split_token(rest) {
                Some((name, content)) => {
                    let result = self.fs.write_file(name, content);
                    self.report(result);
                }
                None => self.missing_argument(command),
            },
            "celv_iniciar" => {
                let result = self.fs.init_versioning();
                self.report(result);
            }
            "celv_historia" => match self.fs.history() {
                Ok(history) => {
                    for action in history {
                        println!("{}", action);
                    }
                }
                Err(err) => eprintln!("{}", err.to_string().red()),
            },
            "celv_version" => match self.fs.version() {
                Ok(version) => println!("{}", version),
                Err(err) => eprintln!("{}", err.to_string().red()),
            },
            "celv_vamos" => self.with_name(command, rest, |shell, arg| match arg.parse() {
                Ok(version) => {
                    let result = shell.fs.set_version(version);
                    shell.report(result);
                }
                Err(_) => shell.missing_argument("celv_vamos"),
            }),
            "celv_fusion" => {
                let parsed = split_token(rest).and_then(|(first, more)| {
                    let second = split_token(more)?.0;
                    Some((first.parse().ok()?, second.parse().ok()?))
                });
                match parsed {
                    Some((v1, v2)) => match self.fs.merge(v1, v2) {
                        Ok(merged) => println!("Fusión creada como versión {}", merged),
                        Err(err) => eprintln!("{}", err.to_string().red()),
                    },
                    None => self.missing_argument(command),
                }
            }
            "celv_importar" => self.with_name(command, rest, |shell, arg| {
                match shell.fs.import_local_path(Path::new(arg)) {
                    Ok(version) => println!("Importado como versión {}", version),
                    Err(err) => eprintln!("{}", err.to_string().red()),
                }
            }),
            unknown => {
                eprintln!("{} is not a valid known command.", unknown.red());
            }
        }
    }

    fn with_name(&mut self, command: &str, rest: &str, f: impl FnOnce(&mut Self, &str)) {
        match split_token(rest) {
            Some((name, _)) => f(self, name),
            None => self.missing_argument(command),
        }
    }

    fn missing_argument(&self, command: &str) {
        eprintln!("Missing argument for command: {}", command);
    }

    fn report(&self, result: celv_core::Result<()>) {
        if let Err(err) = result {
            eprintln!("{}", err.to_string().red());
        }
    }

    fn list(&self) {
        let mut files: Vec<File> = self.fs.list();
        files.sort_by(listing_order);
        for file in files {
            match file.kind() {
                FileKind::Directory => println!("{}", file.name().blue().bold()),
                FileKind::Document => println!("{}", file.name()),
            }
        }
    }

    fn help(&self) {
        println!("Para correr un comando, usa:");
        println!("\t<comando> [argumentos]");
        println!("Los comandos disponibles son:");
        println!("\t- salir : cierra esta terminal");
        println!("\t- ayuda : imprime este mensaje");
        println!("\t- ls : lista los archivos del directorio actual");
        println!("\t- crear_dir nombre_dir : Crea un directorio con el nombre especificado");
        println!("\t- crear_archivo nombre_archivo : Crea un archivo vacío con el nombre especificado");
        println!("\t- eliminar nombre_archivo : Elimina el archivo especificado. Si es un directorio, elimina recursivamente.");
        println!("\t- leer nombre_archivo : Lee el contenido del archivo y lo imprime en la terminal.");
        println!("\t- escribir nombre_archivo contenido : Reemplaza el contenido del archivo.");
        println!("\t- ir nombre_archivo : navega al directorio llamado `nombre_archivo`");
        println!("\t- ir : navega al directorio padre del nodo actual");
        println!("\t- celv_iniciar : Inicializa control de versiones en el subárbol del directorio actual");
        println!("\t- celv_historia : Muestra el historial de cambios del control de versiones activo");
        println!("\t- celv_version : Muestra la versión actual");
        println!("\t- celv_vamos version : cambia la versión actual a la versión especificada");
        println!("\t- celv_fusion version1 version2 : Trata de fusionar las dos versiones especificadas");
        println!("\t- celv_importar camino_directorio : Imita la estructura de archivos del directorio especificado");
    }
}

impl Default for Shell {
    fn default() -> Self {
        Self::new()
    }
}

/// First whitespace-separated token and the remainder of the line (with
/// leading whitespace stripped, trailing content untouched)
fn split_token(line: &str) -> Option<(&str, &str)> {
    let line = line.trim_start();
    if line.is_empty() {
        return None;
    }
    match line.find(char::is_whitespace) {
        Some(idx) => Some((&line[..idx], line[idx..].trim_start())),
        None => Some((line, "")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_token() {
        assert_eq!(split_token("ls"), Some(("ls", "")));
        assert_eq!(split_token("  ir docs  "), Some(("ir", "docs  ")));
        assert_eq!(split_token(""), None);
        assert_eq!(split_token("   "), None);
    }

    #[test]
    fn test_split_token_keeps_content_verbatim() {
        let (command, rest) = split_token("escribir nota hola  mundo ").unwrap();
        assert_eq!(command, "escribir");
        let (name, content) = split_token(rest).unwrap();
        assert_eq!(name, "nota");
        assert_eq!(content, "hola  mundo ");
    }

    #[test]
    fn test_scripted_session() {
        let mut shell = Shell::new();
        shell.running = true;
        for line in [
            "celv_iniciar",
            "crear_dir a",
            "crear_archivo b",
            "escribir b hola",
            "escribir b mundo",
        ] {
            shell.execute(line);
        }

        assert_eq!(shell.fs.version().unwrap(), 4);
        assert_eq!(shell.fs.read_file("b").unwrap(), "mundo");

        shell.execute("celv_vamos 3");
        assert_eq!(shell.fs.read_file("b").unwrap(), "hola");

        shell.execute("salir");
        assert!(!shell.running);
    }

    #[test]
    fn test_errors_do_not_stop_the_session() {
        let mut shell = Shell::new();
        shell.running = true;
        shell.execute("leer fantasma");
        shell.execute("comando_inventado");
        shell.execute("crear_dir");
        assert!(shell.running);
    }
}
