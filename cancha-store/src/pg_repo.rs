use async_trait::async_trait;
use cancha_core::{
    CoreError, CustomerInfo, NewReservation, Reservation, ReservationStore, Slot, SlotTransaction,
    StoreError, StoreResult, TemporaryHold,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;

const RESERVATION_COLUMNS: &str = "id, codigo_reserva, cancha_id, fecha, hora_inicio, hora_fin, \
     nombre_cliente, email_cliente, telefono_cliente, rut_cliente, precio_total, estado, \
     estado_pago, metodo_pago, fecha_creacion, tipo_reserva, comision_aplicada, \
     creada_por_admin, admin_id, porcentaje_pagado";

const HOLD_COLUMNS: &str =
    "id, cancha_id, fecha, hora_inicio, hora_fin, session_id, expira_en, creado_en, datos_cliente";

/// Reservation store over the `reservas` and `bloqueos_temporales` tables.
pub struct PgReservationStore {
    pool: PgPool,
}

impl PgReservationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal structs for type-safe querying
#[derive(sqlx::FromRow)]
struct ReservationRow {
    id: i32,
    codigo_reserva: String,
    cancha_id: i32,
    fecha: NaiveDate,
    hora_inicio: NaiveTime,
    hora_fin: NaiveTime,
    nombre_cliente: String,
    email_cliente: Option<String>,
    telefono_cliente: Option<String>,
    rut_cliente: Option<String>,
    precio_total: i32,
    estado: String,
    estado_pago: String,
    metodo_pago: Option<String>,
    fecha_creacion: DateTime<Utc>,
    tipo_reserva: String,
    comision_aplicada: i32,
    creada_por_admin: bool,
    admin_id: Option<i32>,
    porcentaje_pagado: i32,
}

impl TryFrom<ReservationRow> for Reservation {
    type Error = CoreError;

    fn try_from(row: ReservationRow) -> Result<Self, Self::Error> {
        Ok(Reservation {
            id: row.id,
            code: row.codigo_reserva,
            court_id: row.cancha_id,
            date: row.fecha,
            start_time: row.hora_inicio,
            end_time: row.hora_fin,
            customer: CustomerInfo {
                name: row.nombre_cliente,
                email: row.email_cliente,
                phone: row.telefono_cliente,
                national_id: row.rut_cliente,
            },
            total_price: row.precio_total,
            status: row.estado.parse()?,
            payment_status: row.estado_pago.parse()?,
            payment_method: row.metodo_pago,
            created_at: row.fecha_creacion,
            channel: row.tipo_reserva.parse()?,
            commission: row.comision_aplicada,
            created_by_admin: row.creada_por_admin,
            admin_id: row.admin_id,
            paid_percentage: row.porcentaje_pagado,
        })
    }
}

#[derive(sqlx::FromRow)]
struct HoldRow {
    id: String,
    cancha_id: i32,
    fecha: NaiveDate,
    hora_inicio: NaiveTime,
    hora_fin: NaiveTime,
    session_id: String,
    expira_en: DateTime<Utc>,
    creado_en: DateTime<Utc>,
    datos_cliente: Option<String>,
}

impl From<HoldRow> for TemporaryHold {
    fn from(row: HoldRow) -> Self {
        TemporaryHold {
            id: row.id,
            court_id: row.cancha_id,
            date: row.fecha,
            start_time: row.hora_inicio,
            end_time: row.hora_fin,
            session_id: row.session_id,
            expires_at: row.expira_en,
            created_at: row.creado_en,
            customer_payload: row.datos_cliente,
        }
    }
}

fn into_reservation(row: ReservationRow) -> StoreResult<Reservation> {
    Reservation::try_from(row).map_err(StoreError::backend)
}

/// Unique violations stay distinguishable so callers can retry with a new code.
pub(crate) fn store_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::UniqueViolation(db.constraint().unwrap_or("unknown").to_string())
        }
        _ => StoreError::backend(err),
    }
}

#[async_trait]
impl ReservationStore for PgReservationStore {
    async fn begin(&self) -> StoreResult<Box<dyn SlotTransaction>> {
        let tx = self.pool.begin().await.map_err(store_error)?;
        Ok(Box::new(PgSlotTransaction { tx }))
    }

    async fn purge_expired_holds(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM bloqueos_temporales WHERE expira_en <= $1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(result.rows_affected())
    }

    async fn find_reservation_by_code(&self, code: &str) -> StoreResult<Option<Reservation>> {
        let sql = format!("SELECT {RESERVATION_COLUMNS} FROM reservas WHERE codigo_reserva = $1");
        let row = sqlx::query_as::<_, ReservationRow>(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)?;

        row.map(into_reservation).transpose()
    }

    async fn list_reservations(&self, court_id: i32, date: NaiveDate) -> StoreResult<Vec<Reservation>> {
        let sql = format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservas WHERE cancha_id = $1 AND fecha = $2 ORDER BY hora_inicio"
        );
        let rows = sqlx::query_as::<_, ReservationRow>(&sql)
            .bind(court_id)
            .bind(date)
            .fetch_all(&self.pool)
            .await
            .map_err(store_error)?;

        rows.into_iter().map(into_reservation).collect()
    }

    async fn find_hold(&self, hold_id: &str) -> StoreResult<Option<TemporaryHold>> {
        let sql = format!("SELECT {HOLD_COLUMNS} FROM bloqueos_temporales WHERE id = $1");
        let row = sqlx::query_as::<_, HoldRow>(&sql)
            .bind(hold_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)?;

        Ok(row.map(TemporaryHold::from))
    }
}

pub struct PgSlotTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl SlotTransaction for PgSlotTransaction {
    async fn acquire_slot_lock(&mut self, key: i64) -> StoreResult<()> {
        // Released by Postgres at COMMIT or ROLLBACK
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(key)
            .execute(&mut *self.tx)
            .await
            .map_err(store_error)?;
        debug!(key, "Advisory lock acquired");
        Ok(())
    }

    async fn count_overlapping_reservations(&mut self, slot: &Slot) -> StoreResult<i64> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM reservas
            WHERE cancha_id = $1
              AND fecha = $2
              AND hora_inicio < $4
              AND hora_fin > $3
              AND estado <> 'cancelada'
            "#,
        )
        .bind(slot.court_id)
        .bind(slot.date)
        .bind(slot.start)
        .bind(slot.end)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(store_error)
    }

    async fn count_active_holds(
        &mut self,
        slot: &Slot,
        now: DateTime<Utc>,
        excluding: Option<&str>,
    ) -> StoreResult<i64> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM bloqueos_temporales
            WHERE cancha_id = $1
              AND fecha = $2
              AND expira_en > $3
              AND hora_inicio < $5
              AND hora_fin > $4
              AND ($6::text IS NULL OR id <> $6)
            "#,
        )
        .bind(slot.court_id)
        .bind(slot.date)
        .bind(now)
        .bind(slot.start)
        .bind(slot.end)
        .bind(excluding)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(store_error)
    }

    async fn insert_reservation(&mut self, reservation: &NewReservation) -> StoreResult<Reservation> {
        let sql = format!(
            r#"
            INSERT INTO reservas (
                codigo_reserva, cancha_id, fecha, hora_inicio, hora_fin,
                nombre_cliente, email_cliente, telefono_cliente, rut_cliente,
                precio_total, estado, estado_pago, metodo_pago, fecha_creacion, tipo_reserva,
                comision_aplicada, creada_por_admin, admin_id, porcentaje_pagado
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
            RETURNING {RESERVATION_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, ReservationRow>(&sql)
            .bind(&reservation.code)
            .bind(reservation.slot.court_id)
            .bind(reservation.slot.date)
            .bind(reservation.slot.start)
            .bind(reservation.slot.end)
            .bind(&reservation.customer.name)
            .bind(reservation.customer.email.as_deref())
            .bind(reservation.customer.phone.as_deref())
            .bind(reservation.customer.national_id.as_deref())
            .bind(reservation.total_price)
            .bind(reservation.status.as_str())
            .bind(reservation.payment_status.as_str())
            .bind(reservation.payment_method.as_deref())
            .bind(reservation.created_at)
            .bind(reservation.channel.as_str())
            .bind(reservation.commission)
            .bind(reservation.created_by_admin())
            .bind(reservation.admin_id)
            .bind(reservation.paid_percentage)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(store_error)?;

        into_reservation(row)
    }

    async fn delete_hold(&mut self, hold_id: &str) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM bloqueos_temporales WHERE id = $1")
            .bind(hold_id)
            .execute(&mut *self.tx)
            .await
            .map_err(store_error)?;
        Ok(result.rows_affected())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await.map_err(store_error)
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        self.tx.rollback().await.map_err(store_error)
    }
}
