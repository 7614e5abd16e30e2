// src/db/lead_repo.rs

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use tokio::{fs, sync::Mutex};

use crate::{common::error::AppError, models::lead::LeadsMap};

// Acesso ao arquivo JSON de leads.
//
// Todo leitura-modificação-escrita passa pelo mesmo Mutex, então duas
// mensagens chegando juntas (ou uma mensagem e um PUT) nunca se sobrescrevem.
#[derive(Clone)]
pub struct LeadRepository {
    path: Arc<PathBuf>,
    lock: Arc<Mutex<()>>,
}

impl LeadRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Arc::new(path.into()),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lê o documento inteiro. Se o arquivo não existe, cria um vazio.
    pub async fn get_all(&self) -> Result<LeadsMap, AppError> {
        let _guard = self.lock.lock().await;
        self.read_unlocked().await
    }

    /// Sobrescreve o documento inteiro.
    pub async fn save(&self, leads: &LeadsMap) -> Result<(), AppError> {
        let _guard = self.lock.lock().await;
        self.write_unlocked(leads).await
    }

    /// Executa `f` sobre o documento com o lock segurado e persiste o resultado.
    ///
    /// Se `f` devolver erro nada é gravado.
    pub async fn update<T, F>(&self, f: F) -> Result<T, AppError>
    where
        F: FnOnce(&mut LeadsMap) -> Result<T, AppError>,
    {
        let _guard = self.lock.lock().await;
        let mut leads = self.read_unlocked().await?;
        let result = f(&mut leads)?;
        self.write_unlocked(&leads).await?;
        Ok(result)
    }

    async fn read_unlocked(&self) -> Result<LeadsMap, AppError> {
        match fs::read_to_string(self.path.as_path()).await {
            Ok(data) => Ok(serde_json::from_str(&data)?),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!("📂 Arquivo de leads não encontrado, criando {:?}", self.path);
                let empty = LeadsMap::new();
                self.write_unlocked(&empty).await?;
                Ok(empty)
            }
            Err(e) => Err(e.into()),
        }
    }

    // Grava num arquivo temporário e renomeia por cima do original
    async fn write_unlocked(&self, leads: &LeadsMap) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let body = serde_json::to_string_pretty(leads)?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, body).await?;
        fs::rename(&tmp_path, self.path.as_path()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::lead::Lead;
    use chrono::Utc;

    fn repo_in(dir: &tempfile::TempDir) -> LeadRepository {
        LeadRepository::new(dir.path().join("leads.json"))
    }

    #[tokio::test]
    async fn first_access_creates_empty_document() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo_in(&dir);

        let leads = repo.get_all().await.unwrap();

        assert!(leads.is_empty());
        let on_disk = std::fs::read_to_string(repo.path()).unwrap();
        assert_eq!(on_disk.trim(), "{}");
    }

    #[tokio::test]
    async fn save_then_get_all_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo_in(&dir);

        let mut leads = LeadsMap::new();
        leads.insert(
            "5511999".into(),
            Lead::from_first_message("Ana", "Oi", vec!["Café".into()], vec!["VIP".into()], Utc::now()),
        );
        leads.insert("5511888".into(), Lead::from_contact("Bia", vec![], Utc::now()));
        repo.save(&leads).await.unwrap();

        assert_eq!(repo.get_all().await.unwrap(), leads);
    }

    #[tokio::test]
    async fn corrupt_document_is_reported_not_reset() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo_in(&dir);
        std::fs::write(repo.path(), "{ isto não é json").unwrap();

        let err = repo.get_all().await.unwrap_err();

        assert!(matches!(err, AppError::CorruptStore(_)));
        assert_eq!(std::fs::read_to_string(repo.path()).unwrap(), "{ isto não é json");
    }

    #[tokio::test]
    async fn failed_update_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo_in(&dir);
        repo.save(&LeadsMap::new()).await.unwrap();

        let result: Result<(), AppError> = repo
            .update(|leads| {
                leads.insert("1".into(), Lead::from_contact("X", vec![], Utc::now()));
                Err(AppError::LeadNotFound)
            })
            .await;

        assert!(result.is_err());
        assert!(repo.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn concurrent_updates_are_not_lost() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo_in(&dir);
        repo.save(&LeadsMap::from([(
            "5511999".to_string(),
            Lead::from_contact("Ana", vec![], Utc::now()),
        )]))
        .await
        .unwrap();

        let mut tasks = Vec::new();
        for i in 0..20 {
            let repo = repo.clone();
            tasks.push(tokio::spawn(async move {
                repo.update(|leads| {
                    let lead = leads.get_mut("5511999").ok_or(AppError::LeadNotFound)?;
                    lead.record_interaction(&format!("msg {i}"), &[], &[]);
                    Ok(())
                })
                .await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let leads = repo.get_all().await.unwrap();
        assert_eq!(leads["5511999"].interactions, 20);
        assert_eq!(leads["5511999"].messages.len(), 20);
    }
}
